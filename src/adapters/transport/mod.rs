pub mod http_room;
