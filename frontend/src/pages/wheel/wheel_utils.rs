use shared::error::{NoticeKind, SpinNotice};
use shared::{format_chance, Item, RewardCue};
use std::rc::Rc;
use yew::prelude::*;

// Format the remaining cooldown for the spin button
pub fn format_time(ms: f64) -> String {
    let seconds = (ms / 1000.0).ceil().max(0.0) as u32;
    if seconds >= 60 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

pub fn cue_headline(cue: RewardCue) -> (&'static str, &'static str) {
    match cue {
        RewardCue::Insane => ("INSANE DROP!", "from-fuchsia-500 to-pink-600 border-fuchsia-300 animate-bounce"),
        RewardCue::Mythic => ("Mythic drop!", "from-cyan-400 to-sky-600 border-cyan-300 animate-bounce"),
        RewardCue::Legendary => ("Legendary drop!", "from-purple-500 to-violet-700 border-purple-300 animate-pulse"),
        RewardCue::Rare => ("Rare drop!", "from-red-400 to-red-600 border-red-300 animate-pulse"),
        RewardCue::Regular => ("You got", "from-yellow-400 to-orange-500 border-yellow-300"),
    }
}

#[derive(Properties, PartialEq)]
pub struct CueBannerProps {
    pub cue: RewardCue,
    #[prop_or_default]
    pub prefix: Option<AttrValue>,
}

#[function_component(CueBanner)]
pub fn cue_banner(props: &CueBannerProps) -> Html {
    let (headline, gradient_classes) = cue_headline(props.cue);
    html! {
        <div class="mt-6 mb-4 flex justify-center">
            <div class={classes!(
                "px-6",
                "py-3",
                "rounded-xl",
                "bg-gradient-to-r",
                "text-white",
                "font-bold",
                "text-xl",
                "shadow-lg",
                "border-2",
                gradient_classes
            )}>
                if let Some(prefix) = &props.prefix {
                    <span class="mr-2">{prefix.clone()}</span>
                }
                <span>{headline}</span>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ItemCardProps {
    pub item: Rc<Item>,
    pub is_new: bool,
    pub image_base: AttrValue,
    pub wheel_texture: AttrValue,
}

#[function_component(ItemCard)]
pub fn item_card(props: &ItemCardProps) -> Html {
    let rarity = props.item.rarity();
    let name = if props.item.name.is_empty() {
        props.item.texture.clone()
    } else {
        props.item.name.clone()
    };

    html! {
        <div class="relative flex flex-col items-center p-4 rounded-xl bg-gray-50 dark:bg-gray-700/40 border-2"
            style={format!("border-color: {}", rarity.color())}>
            if props.is_new {
                <span class="absolute -top-2 -right-2 px-2 py-0.5 text-xs font-bold text-white bg-green-500 rounded-full">{"NEW"}</span>
            }
            <img
                class="w-16 h-16 object-contain [image-rendering:pixelated]"
                src={props.item.image_url(&props.image_base, &props.wheel_texture)}
                alt={name.clone()}
            />
            <div class="mt-2 font-semibold text-gray-900 dark:text-white text-center">{name}</div>
            <div class="text-xs font-medium" style={format!("color: {}", rarity.color())}>{rarity.label()}</div>
            if props.item.chance.is_some() {
                <div class="text-xs text-gray-500 dark:text-gray-400">{format!("{}%", format_chance(props.item.chance))}</div>
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct NoticeBannerProps {
    pub notice: SpinNotice,
}

#[function_component(NoticeBanner)]
pub fn notice_banner(props: &NoticeBannerProps) -> Html {
    let class = match props.notice.kind {
        NoticeKind::Cooldown => "text-yellow-800 bg-yellow-50 dark:bg-yellow-900/20 dark:text-yellow-400",
        NoticeKind::NetworkUnavailable | NoticeKind::ServerRejected => "text-red-500 bg-red-50 dark:bg-red-900/20",
    };
    html! {
        <div class="mb-6 text-center">
            <p class={classes!("p-3", "rounded-lg", class)}>{&props.notice.message}</p>
        </div>
    }
}

// Spin button component
#[derive(Properties, PartialEq)]
pub struct SpinButtonProps {
    pub label: AttrValue,
    pub is_spinning: bool,
    pub cooldown_ms: Option<f64>,
    #[prop_or(true)]
    pub is_ready: bool,
    pub onclick: Callback<MouseEvent>,
}

#[function_component(SpinButton)]
pub fn spin_button(props: &SpinButtonProps) -> Html {
    let button_text = if props.is_spinning {
        "Spinning...".to_string()
    } else if let Some(remaining) = props.cooldown_ms {
        format!("Cooldown: {}", format_time(remaining))
    } else if !props.is_ready {
        "Loading...".to_string()
    } else {
        props.label.to_string()
    };

    let is_disabled = props.is_spinning || props.cooldown_ms.is_some() || !props.is_ready;

    let button_class = if is_disabled {
        if props.cooldown_ms.is_some() {
            "bg-gradient-to-r from-blue-400 to-gray-400 opacity-80 cursor-not-allowed text-white"
        } else {
            "bg-gradient-to-r from-gray-400 to-gray-500 opacity-75 cursor-not-allowed text-white"
        }
    } else {
        "bg-gradient-to-r from-yellow-400 to-orange-500 hover:from-yellow-500 hover:to-orange-600 text-white shadow-lg hover:shadow-xl transform hover:-translate-y-0.5 active:translate-y-0"
    };

    let spin_icon_class = if props.is_spinning {
        "inline-block mr-2 animate-spin"
    } else {
        "hidden"
    };

    html! {
        <div class={classes!("relative", "overflow-hidden", "rounded-full", "w-full", button_class)}>
            <button
                onclick={props.onclick.clone()}
                disabled={is_disabled}
                class="relative w-full px-8 py-4 font-bold text-lg transition-all duration-300 border-2 border-transparent hover:border-white focus:outline-none focus:ring-4 focus:ring-yellow-300 focus:ring-opacity-50 bg-transparent"
            >
                <div class="flex items-center justify-center relative z-10">
                    <svg class={spin_icon_class} xmlns="http://www.w3.org/2000/svg" width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2">
                        <circle cx="12" cy="12" r="10" />
                        <path d="M12 6v6l4 2" />
                    </svg>
                    <span>{button_text}</span>
                </div>
            </button>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_time_rounds_up_to_whole_seconds() {
        assert_eq!(format_time(2400.0), "3s");
        assert_eq!(format_time(0.0), "0s");
        assert_eq!(format_time(61_000.0), "1m 1s");
    }
}
