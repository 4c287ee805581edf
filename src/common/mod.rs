pub mod middleware_session;
