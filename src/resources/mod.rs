pub mod canvas;
pub mod constants;
pub mod runtime;
pub mod settings;
pub mod view_state;

pub use canvas::*;
pub use runtime::*;
pub use settings::*;
pub use view_state::*;
