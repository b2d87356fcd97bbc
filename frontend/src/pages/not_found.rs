use yew::prelude::*;
use yew_router::prelude::*;

use crate::styles;
use crate::Route;

#[function_component(NotFound)]
pub fn not_found() -> Html {
    html! {
        <div class={styles::FLEX_CENTER}>
            <div class="text-center">
                <h1 class={styles::TEXT_H1}>{"Nothing here"}</h1>
                <p class={classes!(styles::TEXT_BODY, "mt-4", "mb-6")}>{"This page does not exist."}</p>
                <Link<Route> to={Route::Wheel} classes={classes!(styles::BUTTON_PRIMARY)}>{"Back to the wheel"}</Link<Route>>
            </div>
        </div>
    }
}
