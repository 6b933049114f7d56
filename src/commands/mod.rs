pub mod formats;
pub mod resolve;
pub mod run;

pub use formats::FormatsCommand;
pub use resolve::ResolveCommand;
pub use run::{RunArgs, RunCommand};
