/// Code related to asynchronous features.
///
/// As wasm32 and most other platforms behave differently, there are these wrappers.
use std::future::Future;

use crate::spawn;

// Platform-dependent trait alias for futures that can be spawned
#[cfg(target_arch = "wasm32")]
pub trait SpawnableFuture: Future<Output = ()> + 'static {}
#[cfg(target_arch = "wasm32")]
impl<F> SpawnableFuture for F where F: Future<Output = ()> + 'static {}

#[cfg(not(target_arch = "wasm32"))]
pub trait SpawnableFuture: Future<Output = ()> + Send + 'static {}
#[cfg(not(target_arch = "wasm32"))]
impl<F> SpawnableFuture for F where F: Future<Output = ()> + Send + 'static {}

/// Runs `f` in the background. Completion is reported by whatever `f` sends.
pub fn perform_async_work<F>(f: F)
where
    F: SpawnableFuture,
{
    spawn!(f);
}

#[cfg(target_arch = "wasm32")]
pub async fn sleep_ms(delay: u64) {
    use wasm_bindgen_futures::js_sys;

    let mut cb = |resolve: js_sys::Function, _reject: js_sys::Function| {
        if let Some(window) = web_sys::window() {
            let _ = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, delay as i32);
        }
    };

    let p = js_sys::Promise::new(&mut cb);

    let _ = wasm_bindgen_futures::JsFuture::from(p).await;
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep_ms(delay_ms: u64) {
    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
}

#[macro_export]
macro_rules! spawn {
    ($task:expr) => {
        #[cfg(not(target_arch = "wasm32"))]
        tokio::spawn($task);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local($task);
    };
}
