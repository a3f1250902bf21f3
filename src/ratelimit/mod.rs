// Gateway module for ratelimit - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod limiter;

// Public re-exports - the ONLY way to access rate limiting functionality
pub use limiter::RateLimiter;
