#![allow(dead_code)]

pub mod fake_storage;
pub mod storage_server;

use prost_reflect::{
    DescriptorPool, DynamicMessage, EnumDescriptor, MessageDescriptor, ServiceDescriptor,
    Value as ReflectValue,
};
use std::sync::LazyLock;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, MethodDescriptorProto,
    OneofDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

pub const STORAGE_SERVICE: &str = "storage.v1.BucketService";

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn typed(name: &str, number: i32, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.into()),
        ..field(name, number, ty)
    }
}

fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field
    }
}

/// A proto3 `optional` field: it tracks presence through its own synthetic oneof.
fn optional(field: FieldDescriptorProto, oneof_index: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index: Some(oneof_index),
        proto3_optional: Some(true),
        ..field
    }
}

fn synthetic_oneofs(fields: &[&str]) -> Vec<OneofDescriptorProto> {
    fields
        .iter()
        .map(|field| OneofDescriptorProto {
            name: Some(format!("_{field}")),
            ..Default::default()
        })
        .collect()
}

fn json_name(name: &str) -> String {
    let mut out = String::new();
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn message_proto(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.into()),
        field: fields,
        ..Default::default()
    }
}

fn map_entry(name: &str, value: FieldDescriptorProto) -> DescriptorProto {
    keyed_map_entry(name, Type::String, value)
}

fn keyed_map_entry(name: &str, key: Type, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message_proto(name, vec![field("key", 1, key), value])
    }
}

fn method(name: &str, input: &str, output: &str, client: bool, server: bool) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.into()),
        input_type: Some(format!(".storage.v1.{input}")),
        output_type: Some(format!(".storage.v1.{output}")),
        client_streaming: Some(client),
        server_streaming: Some(server),
        ..Default::default()
    }
}

fn timestamp_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/protobuf/timestamp.proto".into()),
        package: Some("google.protobuf".into()),
        message_type: vec![message_proto(
            "Timestamp",
            vec![field("seconds", 1, Type::Int64), field("nanos", 2, Type::Int32)],
        )],
        syntax: Some("proto3".into()),
        ..Default::default()
    }
}

fn decimal_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/type/decimal.proto".into()),
        package: Some("google.type".into()),
        message_type: vec![message_proto("Decimal", vec![field("value", 1, Type::String)])],
        syntax: Some("proto3".into()),
        ..Default::default()
    }
}

fn storage_file() -> FileDescriptorProto {
    let status = EnumDescriptorProto {
        name: Some("BucketStatus".into()),
        value: ["BUCKET_STATUS_UNSPECIFIED", "BUCKET_STATUS_ACTIVE", "BUCKET_STATUS_ARCHIVED"]
            .into_iter()
            .zip(0..)
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some(name.into()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    let bucket = DescriptorProto {
        nested_type: vec![
            map_entry("TagsEntry", field("value", 2, Type::String)),
            keyed_map_entry("VersionsEntry", Type::Int32, field("value", 2, Type::String)),
        ],
        oneof_decl: synthetic_oneofs(&["is_public", "size", "ratio"]),
        ..message_proto(
            "Bucket",
            vec![
                field("name", 1, Type::String),
                typed("status", 2, Type::Enum, ".storage.v1.BucketStatus"),
                typed("created_at", 3, Type::Message, ".google.protobuf.Timestamp"),
                optional(field("is_public", 4, Type::Bool), 0),
                repeated(typed("tags", 5, Type::Message, ".storage.v1.Bucket.TagsEntry")),
                repeated(field("regions", 6, Type::String)),
                optional(field("size", 7, Type::Int64), 1),
                typed("owner", 8, Type::Message, ".storage.v1.Owner"),
                optional(field("ratio", 9, Type::Double), 2),
                typed("quota", 10, Type::Message, ".google.type.Decimal"),
                repeated(typed(
                    "versions",
                    11,
                    Type::Message,
                    ".storage.v1.Bucket.VersionsEntry",
                )),
            ],
        )
    };

    let create_request = DescriptorProto {
        nested_type: vec![map_entry(
            "OwnersEntry",
            typed("value", 2, Type::Message, ".storage.v1.Owner"),
        )],
        ..message_proto(
            "CreateBucketRequest",
            vec![
                typed("bucket", 1, Type::Message, ".storage.v1.Bucket"),
                repeated(typed("grants", 2, Type::Message, ".storage.v1.Owner")),
                repeated(typed(
                    "owners",
                    3,
                    Type::Message,
                    ".storage.v1.CreateBucketRequest.OwnersEntry",
                )),
            ],
        )
    };

    let service = ServiceDescriptorProto {
        name: Some("BucketService".into()),
        method: vec![
            method("GetBucket", "GetBucketRequest", "Bucket", false, false),
            method("ListBuckets", "ListBucketsRequest", "Bucket", false, true),
            method("PutBuckets", "Bucket", "PutBucketsResponse", true, false),
            method("DeleteBucket", "GetBucketRequest", "Bucket", false, false),
        ],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("storage/v1/storage.proto".into()),
        package: Some("storage.v1".into()),
        dependency: vec![
            "google/protobuf/timestamp.proto".into(),
            "google/type/decimal.proto".into(),
        ],
        message_type: vec![
            bucket,
            message_proto(
                "Owner",
                vec![field("display_name", 1, Type::String), field("id", 2, Type::String)],
            ),
            message_proto("GetBucketRequest", vec![field("bucket_name", 1, Type::String)]),
            message_proto(
                "ListBucketsRequest",
                vec![field("limit", 1, Type::Int32), field("prefix", 2, Type::String)],
            ),
            message_proto("PutBucketsResponse", vec![field("count", 1, Type::Int32)]),
            message_proto(
                "PutObjectRequest",
                vec![field("bucket_name", 1, Type::String), field("key", 2, Type::String)],
            ),
            create_request,
        ],
        enum_type: vec![status],
        service: vec![service],
        syntax: Some("proto3".into()),
        ..Default::default()
    }
}

pub fn descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![timestamp_file(), decimal_file(), storage_file()],
    }
}

pub fn descriptor_set_bytes() -> Vec<u8> {
    prost::Message::encode_to_vec(&descriptor_set())
}

static POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    DescriptorPool::from_file_descriptor_set(descriptor_set()).expect("valid fixture descriptors")
});

pub fn pool() -> DescriptorPool {
    POOL.clone()
}

pub fn message(name: &str) -> MessageDescriptor {
    pool()
        .get_message_by_name(&format!("storage.v1.{name}"))
        .unwrap_or_else(|| panic!("no message storage.v1.{name}"))
}

pub fn storage_service() -> ServiceDescriptor {
    pool()
        .get_service_by_name(STORAGE_SERVICE)
        .expect("BucketService")
}

pub fn bucket_status() -> EnumDescriptor {
    pool()
        .get_enum_by_name("storage.v1.BucketStatus")
        .expect("BucketStatus enum")
}

pub fn bucket(name: &str, status: i32, size: i64) -> DynamicMessage {
    let mut bucket = DynamicMessage::new(message("Bucket"));
    bucket.set_field_by_name("name", ReflectValue::String(name.to_string()));
    bucket.set_field_by_name("status", ReflectValue::EnumNumber(status));
    bucket.set_field_by_name("size", ReflectValue::I64(size));
    bucket
}

pub fn all_buckets() -> Vec<DynamicMessage> {
    vec![
        bucket("logs", 1, 10),
        bucket("media", 2, 20),
        bucket("logs-archive", 2, 30),
    ]
}

pub fn string_field(message: &DynamicMessage, name: &str) -> String {
    message
        .get_field_by_name(name)
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
