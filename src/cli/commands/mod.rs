mod grant;

pub use grant::cmd_grant;
