mod api;
mod sql_test;
mod util;
