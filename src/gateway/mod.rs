// Gateway module for the request gateway - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod handlers;
mod response;

// Public re-exports - the ONLY way to access request handling functionality
pub use handlers::RequestGateway;
pub use response::GatewayResponse;
