pub mod auth_handler;

pub use auth_handler::{
    __path_callback, __path_get_me, __path_request_magic_link, __path_signin_email, callback,
    get_me, request_magic_link, signin_email,
};
