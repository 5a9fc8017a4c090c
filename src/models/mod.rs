pub mod peer_address;
