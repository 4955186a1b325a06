mod support;

mod convergence;
mod database;
mod images;
mod lifecycle;
