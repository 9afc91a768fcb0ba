pub mod command_runner;
pub mod request_dispatcher;

pub use command_runner::CommandRunner;
pub use request_dispatcher::RequestDispatcher;
