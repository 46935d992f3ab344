//! Message and service types generated from `proto/provider.proto`.

tonic::include_proto!("tacticalrmm.provider.v1");
