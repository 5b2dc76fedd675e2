// Voice provider webhook: server-side function calls and call status updates.

pub mod handlers;
