// Network adapter modules split by host sockets, read-only API and operator setup routes.

pub mod api;
pub mod client;
pub mod setup;

pub use api::{round_handler, shorten_countdown_handler, stats_handler};
pub use client::{notice_serializer, ws_handler};
pub use setup::{
    add_floor_handler, add_map_handler, list_maps_handler, remove_map_handler,
    set_death_height_handler, set_spawn_handler, set_waiting_map_handler,
};
