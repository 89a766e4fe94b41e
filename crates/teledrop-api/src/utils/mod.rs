pub mod hotlink;
