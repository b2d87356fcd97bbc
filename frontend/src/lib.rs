pub mod config;
pub mod pages;
pub mod platform;
pub mod styles;

use shared::config::ConfigLoader;
use std::rc::Rc;
use yew::prelude::*;
use yew_router::prelude::*;

use crate::pages::{not_found::NotFound, wheel::WheelPage};
use crate::platform::HttpConfigSource;

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Wheel,
    #[not_found]
    #[at("/404")]
    NotFound,
}

/// App-wide config loader, shared through context
#[derive(Clone)]
pub struct ConfigHandle(pub Rc<ConfigLoader<HttpConfigSource>>);

impl PartialEq for ConfigHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[function_component(App)]
pub fn app() -> Html {
    let config = use_memo((), |_| ConfigHandle(Rc::new(ConfigLoader::new(HttpConfigSource))));

    html! {
        <ContextProvider<ConfigHandle> context={(*config).clone()}>
            <BrowserRouter>
                <div class={styles::CONTAINER}>
                    <div class="mx-auto">
                        <Switch<Route> render={switch} />
                    </div>
                </div>
            </BrowserRouter>
        </ContextProvider<ConfigHandle>>
    }
}

pub fn switch(route: Route) -> Html {
    match route {
        Route::Wheel => html! { <WheelPage /> },
        Route::NotFound => html! { <NotFound /> },
    }
}
