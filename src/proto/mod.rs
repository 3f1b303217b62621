//! Wire types and service stubs generated from `proto/staff.proto`.

#![allow(clippy::all)]

tonic::include_proto!("staff");
