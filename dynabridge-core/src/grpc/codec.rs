//! # DynamicMessage <-> Protobuf Codec
//!
//! This module implements `tonic::codec::Codec` so that `tonic` can transport
//! `prost_reflect::DynamicMessage` values directly, without generated Rust structs.
//!
//! ## How it works
//!
//! 1. **Encoder**: checks that the outgoing message is an instance of the method's input
//!    descriptor and writes its binary encoding into the gRPC buffer.
//! 2. **Decoder**: merges the raw bytes into a fresh `DynamicMessage` of the method's
//!    output descriptor.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A codec bound to the request and response descriptors of one method.
pub struct DynamicCodec {
    req_desc: MessageDescriptor,
    res_desc: MessageDescriptor,
}

impl DynamicCodec {
    pub fn new(req_desc: MessageDescriptor, res_desc: MessageDescriptor) -> Self {
        Self { req_desc, res_desc }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder(self.req_desc.clone())
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.res_desc.clone())
    }
}

pub struct DynamicEncoder(MessageDescriptor);

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        if item.descriptor() != self.0 {
            return Err(Status::invalid_argument(format!(
                "Expected a '{}' message, got '{}'",
                self.0.full_name(),
                item.descriptor().full_name()
            )));
        }

        item.encode_raw(dst);
        Ok(())
    }
}

pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut msg = DynamicMessage::new(self.0.clone());
        msg.merge(src)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {}", e)))?;

        Ok(Some(msg))
    }
}
