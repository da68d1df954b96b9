mod handlers;
mod models;
mod page;
mod state;
mod translate;
mod upload;
mod util;

pub use handlers::{router, run_server};
pub use models::TranslateResponse;
pub use state::ServerState;
