//! Generated code for `protocol/image.idl`, compiled as a normal module.

pub mod image {
    include!(concat!(env!("OUT_DIR"), "/image_protocol.rs"));
}
