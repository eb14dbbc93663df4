// Layout export API: template catalogue, layout generation, render plans.
// Generation runs inside tokio::task::spawn_blocking; handlers only orchestrate.

pub mod handlers;
