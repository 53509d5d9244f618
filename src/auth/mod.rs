pub mod blocklist;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod rate_limit;
pub mod role;
pub mod url_token;
