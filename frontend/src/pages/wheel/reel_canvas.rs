use shared::bonus::BONUS_LAYOUT;
use shared::frame::FrameClock;
use shared::BonusEvent;
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{window, CanvasRenderingContext2d, HtmlCanvasElement};
use yew::prelude::*;

use super::ControllerHandle;
use crate::platform::BrowserClock;

const CANVAS_WIDTH: u32 = 800;
const BONUS_TILE_COLOR: &str = "#FF8800";
const MARKER_COLOR: &str = "#FFD700";

/// What a strip canvas draws
#[derive(Clone, PartialEq)]
pub enum StripSource {
    Reel(usize),
    Bonus(Rc<Vec<BonusEvent>>),
}

struct Tile<'a> {
    label: &'a str,
    color: &'a str,
}

#[derive(Properties, PartialEq)]
pub struct StripCanvasProps {
    pub controller: ControllerHandle,
    pub source: StripSource,
    #[prop_or(120)]
    pub height: u32,
}

/// Repaints every animation frame from the controller's polled offsets.
#[function_component(StripCanvas)]
pub fn strip_canvas(props: &StripCanvasProps) -> Html {
    let canvas_ref = use_node_ref();

    {
        let canvas_ref = canvas_ref.clone();
        use_effect_with((props.controller.clone(), props.source.clone()), move |(controller, source)| {
            let alive = Rc::new(Cell::new(true));
            let running = Rc::clone(&alive);
            let (controller, source) = (controller.clone(), source.clone());

            spawn_local(async move {
                let clock = BrowserClock;
                while running.get() {
                    clock.next_frame().await;
                    if !running.get() {
                        break;
                    }
                    if let Some(context) = context_2d(&canvas_ref) {
                        paint(&context, &controller, &source);
                    }
                }
            });

            move || alive.set(false)
        });
    }

    html! {
        <canvas
            ref={canvas_ref}
            width={CANVAS_WIDTH.to_string()}
            height={props.height.to_string()}
            class="w-full rounded-xl bg-gray-100 dark:bg-gray-900"
        />
    }
}

fn context_2d(canvas_ref: &NodeRef) -> Option<CanvasRenderingContext2d> {
    canvas_ref
        .cast::<HtmlCanvasElement>()?
        .get_context("2d")
        .ok()??
        .dyn_into::<CanvasRenderingContext2d>()
        .ok()
}

fn is_dark_mode() -> bool {
    window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
        .map(|el| el.class_list().contains("dark"))
        .unwrap_or(false)
}

fn paint(context: &CanvasRenderingContext2d, controller: &ControllerHandle, source: &StripSource) {
    let Some(canvas) = context.canvas() else {
        return;
    };
    let width = canvas.width() as f64;
    let height = canvas.height() as f64;
    context.clear_rect(0.0, 0.0, width, height);
    let text_color = if is_dark_mode() { "#f3f4f6" } else { "#111827" };

    match source {
        StripSource::Reel(index) => {
            let offset = controller.0.reel_offset(*index).unwrap_or(0.0);
            let item_width = controller.0.layout().item_width;
            controller.0.with_reel(*index, |reel| {
                paint_tiles(context, width, height, item_width, offset, reel.len(), text_color, |slot| {
                    reel.get(slot).map(|item| Tile {
                        label: if item.name.is_empty() { &item.texture } else { &item.name },
                        color: item.rarity().color(),
                    })
                });
            });
        }
        StripSource::Bonus(strip) => {
            let offset = controller.0.bonus_offset();
            paint_tiles(context, width, height, BONUS_LAYOUT.item_width, offset, strip.len(), text_color, |slot| {
                strip.get(slot).map(|event| Tile {
                    label: &event.name,
                    color: event.color.as_deref().unwrap_or(BONUS_TILE_COLOR),
                })
            });
        }
    }

    // Center marker
    context.set_stroke_style_str(MARKER_COLOR);
    context.set_line_width(3.0);
    context.begin_path();
    context.move_to(width / 2.0, 0.0);
    context.line_to(width / 2.0, height);
    context.stroke();
}

/// Slot `i` is centred under the marker when `offset == i * item_width`.
#[allow(clippy::too_many_arguments)]
fn paint_tiles<'a>(
    context: &CanvasRenderingContext2d,
    width: f64,
    height: f64,
    item_width: f64,
    offset: f64,
    count: usize,
    text_color: &str,
    tile_at: impl Fn(usize) -> Option<Tile<'a>>,
) {
    let first = ((offset - width / 2.0) / item_width).floor().max(0.0) as usize;
    let last = (((offset + width / 2.0) / item_width).ceil().max(0.0) as usize + 1).min(count);

    context.set_font("12px sans-serif");
    context.set_text_align("center");
    context.set_text_baseline("middle");

    for slot in first..last {
        let Some(tile) = tile_at(slot) else {
            continue;
        };
        let x = slot as f64 * item_width - offset + width / 2.0 - item_width / 2.0;

        context.set_global_alpha(0.25);
        context.set_fill_style_str(tile.color);
        context.fill_rect(x + 2.0, 8.0, item_width - 4.0, height - 16.0);
        context.set_global_alpha(1.0);

        context.set_stroke_style_str(tile.color);
        context.set_line_width(2.0);
        context.stroke_rect(x + 2.0, 8.0, item_width - 4.0, height - 16.0);

        context.set_fill_style_str(text_color);
        let _ = context.fill_text_with_max_width(tile.label, x + item_width / 2.0, height / 2.0, item_width - 8.0);
    }
}
