mod reel_canvas;
mod wheel_utils;

use gloo_timers::callback::Interval;
use log::{error, warn};
use shared::config::{ConfigLoader, WheelConfig};
use shared::error::{SpinError, SpinNotice};
use shared::session::{SessionRun, SessionState, SpinController};
use shared::{BonusEvent, Item, RecursionStatus, RewardCue};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::platform::{fetch_catalog, BrowserClock, FetchTransport, HttpConfigSource};
use crate::styles;
use crate::ConfigHandle;
use reel_canvas::{StripCanvas, StripSource};
use wheel_utils::{CueBanner, ItemCard, NoticeBanner, SpinButton};

pub type WheelController = SpinController<FetchTransport, BrowserClock>;

/// Shared controller; equal only to itself so props never deep-compare it
#[derive(Clone)]
pub struct ControllerHandle(pub Rc<WheelController>);

impl PartialEq for ControllerHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Spawns a started session, or surfaces why it could not start.
fn launch(attempt: Result<SessionRun, SpinError>, notice: &UseStateHandle<Option<SpinNotice>>) {
    match attempt {
        Ok(run) => {
            notice.set(None);
            spawn_local(run);
        }
        Err(err) => {
            warn!("Spin rejected before start: {}", err);
            notice.set(err.notice());
        }
    }
}

/// Everything a stage renderer needs besides the state itself
struct Stage<'a> {
    controller: &'a ControllerHandle,
    config: &'a WheelConfig,
    on_respin: Callback<MouseEvent>,
    on_reset: Callback<MouseEvent>,
}

impl Stage<'_> {
    fn reels(&self) -> Html {
        let count = self.controller.0.reel_count();
        html! {
            <div class="space-y-3">
                { for (0..count).map(|index| html! {
                    <StripCanvas
                        key={index}
                        controller={self.controller.clone()}
                        source={StripSource::Reel(index)}
                        height={if count > 1 { 90 } else { 120 }}
                    />
                }) }
            </div>
        }
    }

    fn item_card(&self, item: &Rc<Item>, is_new: bool) -> Html {
        html! {
            <ItemCard
                item={Rc::clone(item)}
                is_new={is_new}
                image_base={self.config.image_base_url.clone()}
                wheel_texture={self.config.wheel_texture_url.clone()}
            />
        }
    }

    fn result_actions(&self) -> Html {
        html! {
            <div class="flex justify-center gap-4 mt-6">
                <button class={styles::BUTTON_PRIMARY} onclick={self.on_respin.clone()}>{"Spin again"}</button>
                <button class={styles::BUTTON_SECONDARY} onclick={self.on_reset.clone()}>{"Back"}</button>
            </div>
        }
    }

    fn spinning(&self, caption: &str) -> Html {
        html! {
            <>
                { self.reels() }
                <p class={classes!(styles::TEXT_SMALL, "mt-4", "text-center")}>{caption.to_string()}</p>
            </>
        }
    }

    fn single_result(&self, item: &Rc<Item>, is_new: bool, cue: RewardCue, prefix: Option<&'static str>) -> Html {
        html! {
            <>
                { self.reels() }
                <CueBanner cue={cue} prefix={prefix.map(AttrValue::from)} />
                <div class="flex justify-center">{ self.item_card(item, is_new) }</div>
                { self.result_actions() }
            </>
        }
    }

    fn multi_result(&self, items: &[Rc<Item>], new_flags: &[bool], cue: RewardCue, prefix: &'static str) -> Html {
        html! {
            <>
                { self.reels() }
                <CueBanner cue={cue} prefix={Some(AttrValue::from(prefix))} />
                <div class="grid grid-cols-2 sm:grid-cols-5 gap-3">
                    { for items.iter().zip(new_flags.iter().chain(std::iter::repeat(&false))).map(|(item, is_new)| self.item_card(item, *is_new)) }
                </div>
                { self.result_actions() }
            </>
        }
    }

    fn event(&self, item: &Rc<Item>) -> Html {
        html! {
            <>
                { self.reels() }
                <div class="mt-6 flex flex-col items-center">
                    <div class="text-2xl font-bold text-orange-500 animate-pulse mb-4">{"Bonus event!"}</div>
                    { self.item_card(item, false) }
                </div>
            </>
        }
    }

    fn bonus_wheel(&self, strip: &[BonusEvent]) -> Html {
        html! {
            <>
                <h2 class={classes!(styles::TEXT_H3, "text-center", "mb-4")}>{"Bonus wheel"}</h2>
                <StripCanvas
                    controller={self.controller.clone()}
                    source={StripSource::Bonus(Rc::new(strip.to_vec()))}
                    height={140}
                />
            </>
        }
    }

    fn bonus_result(&self, event: &BonusEvent) -> Html {
        html! {
            <div class="mt-6 flex flex-col items-center text-center">
                <div class="px-6 py-4 rounded-xl bg-gradient-to-r from-orange-400 to-orange-600 text-white font-bold text-2xl shadow-lg animate-bounce">
                    {&event.name}
                </div>
                <p class={classes!(styles::TEXT_BODY, "mt-3")}>{&event.description}</p>
            </div>
        }
    }

    fn recursion(&self, item: &Rc<Item>, is_new: bool, status: Option<&RecursionStatus>, cue: RewardCue) -> Html {
        let details = status.map(|status| {
            let by = status
                .triggered_by
                .as_ref()
                .map(|name| format!(" Triggered by {}.", name))
                .unwrap_or_default();
            format!("{} free lucky spins for everyone!{}", status.lucky_spins_remaining, by)
        });
        html! {
            <>
                { self.reels() }
                <div class="mt-6 text-center text-3xl font-extrabold text-emerald-400 animate-pulse">{"RECURSION"}</div>
                if let Some(details) = details {
                    <p class={classes!(styles::TEXT_BODY, "text-center", "mt-2")}>{details}</p>
                }
                <CueBanner cue={cue} />
                <div class="flex justify-center">{ self.item_card(item, is_new) }</div>
                { self.result_actions() }
            </>
        }
    }

    /// One render per session state
    fn render(&self, state: &SessionState) -> Html {
        match state {
            SessionState::Idle { .. } => html! {},
            SessionState::Spinning => self.spinning("Spinning..."),
            SessionState::LuckySpinning => self.spinning("Lucky spin: every item has the same odds"),
            SessionState::TripleSpinning => self.spinning("5x bonus spin"),
            SessionState::TripleLuckySpinning => self.spinning("Triple lucky spin"),
            SessionState::Result { item, is_new, cue, .. } => self.single_result(item, *is_new, *cue, None),
            SessionState::LuckyResult { item, is_new, cue, .. } => {
                self.single_result(item, *is_new, *cue, Some("Lucky!"))
            }
            SessionState::Event { item } => self.event(item),
            SessionState::BonusWheel { strip, .. } => self.bonus_wheel(strip),
            SessionState::BonusResult { event } => self.bonus_result(event),
            SessionState::Recursion {
                item,
                is_new,
                status,
                cue,
                ..
            } => self.recursion(item, *is_new, status.as_ref(), *cue),
            SessionState::TripleResult { items, new_flags, cue, .. } => self.multi_result(items, new_flags, *cue, "5x:"),
            SessionState::TripleLuckyResult { items, new_flags, cue, .. } => {
                self.multi_result(items, new_flags, *cue, "Triple lucky:")
            }
        }
    }
}

#[function_component(WheelPage)]
pub fn wheel_page() -> Html {
    let loader = use_context::<ConfigHandle>()
        .unwrap_or_else(|| ConfigHandle(Rc::new(ConfigLoader::new(HttpConfigSource))));

    let controller = use_state(|| None::<ControllerHandle>);
    let config = use_state(|| None::<Rc<WheelConfig>>);
    let session = use_state(SessionState::default);
    let recursion = use_state(|| None::<RecursionStatus>);
    let local_notice = use_state(|| None::<SpinNotice>);
    let catalog_ready = use_state(|| false);
    let load_error = use_state(|| None::<String>);
    let mounted = use_mut_ref(|| None::<Rc<WheelController>>);
    let rerender = use_force_update();

    // Build the controller once config is known, tear it down on unmount
    {
        let controller = controller.clone();
        let config = config.clone();
        let session = session.clone();
        let recursion = recursion.clone();
        let catalog_ready = catalog_ready.clone();
        let load_error = load_error.clone();
        let mounted = mounted.clone();

        use_effect_with((), move |_| {
            let unmounted = Rc::new(Cell::new(false));
            let gone = Rc::clone(&unmounted);
            let slot = mounted.clone();

            spawn_local(async move {
                let wheel_config = loader.0.load().await;
                if gone.get() {
                    return;
                }

                let engine = Rc::new(SpinController::new(FetchTransport, Rc::new(BrowserClock), &wheel_config));
                engine.subscribe(move |state| {
                    if let Some(status) = state.recursion_status() {
                        recursion.set(Some(status.clone()));
                    }
                    session.set(state.clone());
                });
                *slot.borrow_mut() = Some(Rc::clone(&engine));
                config.set(Some(wheel_config));
                controller.set(Some(ControllerHandle(Rc::clone(&engine))));

                match fetch_catalog().await {
                    Ok(catalog) => {
                        engine.set_catalog(catalog);
                        catalog_ready.set(true);
                    }
                    Err(err) => {
                        error!("Failed to load item catalog: {}", err);
                        load_error.set(Some(err));
                    }
                }
            });

            move || {
                unmounted.set(true);
                if let Some(engine) = mounted.borrow_mut().take() {
                    engine.shutdown();
                }
            }
        });
    }

    // Refresh the cooldown label while it counts down
    {
        use_effect_with((*controller).clone(), move |handle| {
            let interval = handle.clone().map(|handle| {
                Interval::new(250, move || {
                    if handle.0.cooldown_remaining().is_some() {
                        rerender.force_update();
                    }
                })
            });
            move || drop(interval)
        });
    }

    let on_spin = {
        let controller = controller.clone();
        let local_notice = local_notice.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(handle) = &*controller {
                launch(handle.0.spin(), &local_notice);
            }
        })
    };

    let on_lucky = {
        let controller = controller.clone();
        let local_notice = local_notice.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(handle) = &*controller {
                launch(handle.0.spin_lucky(), &local_notice);
            }
        })
    };

    let on_respin = {
        let controller = controller.clone();
        let local_notice = local_notice.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(handle) = &*controller {
                launch(handle.0.respin(), &local_notice);
            }
        })
    };

    let on_reset = {
        let controller = controller.clone();
        let local_notice = local_notice.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(handle) = &*controller {
                if let Err(err) = handle.0.reset() {
                    warn!("Reset ignored: {}", err);
                }
            }
            local_notice.set(None);
        })
    };

    let notice = match &*session {
        SessionState::Idle { notice: Some(notice) } => Some(notice.clone()),
        _ => (*local_notice).clone(),
    };
    let lucky_available = recursion.as_ref().is_some_and(|status| {
        let ends_at_ms = status
            .ends_at
            .as_deref()
            .map(js_sys::Date::parse)
            .filter(|ms| !ms.is_nan());
        status.offers_lucky_spin(ends_at_ms, js_sys::Date::now())
    });

    html! {
        <div class="container mx-auto px-4 py-8">
            <h1 class="text-3xl font-bold mb-6 text-center text-gray-900 dark:text-white">
                <span class="bg-clip-text text-transparent bg-gradient-to-r from-yellow-400 to-orange-500">{"Loot Wheel"}</span>
            </h1>

            <div class="bg-white dark:bg-gray-800 p-6 sm:p-8 rounded-2xl shadow-xl max-w-4xl mx-auto border border-gray-100 dark:border-gray-700">
                if let Some(error) = &*load_error {
                    <div class={classes!(styles::ALERT_ERROR, "mb-6")}>{format!("Items unavailable: {}", error)}</div>
                }
                if let Some(notice) = notice {
                    <NoticeBanner notice={notice} />
                }

                {
                    match (&*controller, &*config) {
                        (Some(handle), Some(wheel_config)) => {
                            let stage = Stage {
                                controller: handle,
                                config: wheel_config,
                                on_respin,
                                on_reset,
                            };
                            if session.is_idle() {
                                html! {
                                    <div class="flex flex-col items-center gap-4 mt-4">
                                        <div class="w-full max-w-[300px]">
                                            <SpinButton
                                                label="Spin"
                                                is_spinning={false}
                                                cooldown_ms={handle.0.cooldown_remaining()}
                                                is_ready={*catalog_ready}
                                                onclick={on_spin}
                                            />
                                        </div>
                                        if lucky_available {
                                            <div class="w-full max-w-[300px]">
                                                <SpinButton
                                                    label="Lucky Spin (Recursion)"
                                                    is_spinning={false}
                                                    cooldown_ms={None::<f64>}
                                                    is_ready={*catalog_ready}
                                                    onclick={on_lucky}
                                                />
                                            </div>
                                        }
                                    </div>
                                }
                            } else {
                                stage.render(&session)
                            }
                        }
                        _ => html! {
                            <div class="flex justify-center">
                                <div class={styles::LOADING_SPINNER}></div>
                            </div>
                        },
                    }
                }
            </div>
        </div>
    }
}
