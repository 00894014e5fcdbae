pub mod config;
pub mod db;
pub mod normalization;
pub mod sync;
pub mod tmdb;

pub mod util {
    pub mod env;
}
