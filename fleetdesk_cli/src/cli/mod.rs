mod auth;
mod common;
mod dashboard;
mod devices;
mod locations;
mod root;
mod route;

pub(crate) use root::get_args;
