/// Logs a formatted message only when debug mode is enabled (F1)
#[macro_export]
macro_rules! debug_log {
    ($debug_settings:expr, $($arg:tt)*) => {
        if $debug_settings.debug_mode {
            bevy::prelude::info!(target: "tilecanvas::debug", $($arg)*);
        }
    };
}
