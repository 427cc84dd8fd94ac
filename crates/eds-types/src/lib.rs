//! # eds-types
//!
//! Hand-maintained wire types for the Envoy endpoint discovery API surface.
//!
//! Only the messages the EDS subsystem actually emits are defined here:
//! `ClusterLoadAssignment` and the locality/endpoint types underneath it.
//! The structs carry the upstream field tags and encode with `prost`, so a
//! resource packed into [`prost_types::Any`] is byte-compatible with what a
//! generated binding would produce.
//!
//! Wider API coverage (clusters, listeners, routes) belongs to the transport
//! layer and is deliberately absent.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)] // wire types mirror the upstream protos

// Re-export prost types for convenience
pub use prost::Message;
pub use prost_types::Any;

pub mod envoy {
    //! Envoy wire types.

    pub mod config {
        //! Envoy configuration types.

        pub mod core {
            //! Core configuration types.

            pub mod v3 {
                //! Core v3 API.

                /// Hierarchical placement of an endpoint.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Locality {
                    #[prost(string, tag = "1")]
                    pub region: ::prost::alloc::string::String,
                    #[prost(string, tag = "2")]
                    pub zone: ::prost::alloc::string::String,
                    #[prost(string, tag = "3")]
                    pub sub_zone: ::prost::alloc::string::String,
                }

                /// Network address of an endpoint.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Address {
                    #[prost(oneof = "address::Address", tags = "1")]
                    pub address: ::core::option::Option<address::Address>,
                }

                pub mod address {
                    //! Address variants.

                    #[derive(Clone, PartialEq, ::prost::Oneof)]
                    pub enum Address {
                        #[prost(message, tag = "1")]
                        SocketAddress(super::SocketAddress),
                    }
                }

                /// TCP/UDP socket address.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct SocketAddress {
                    #[prost(string, tag = "2")]
                    pub address: ::prost::alloc::string::String,
                    #[prost(uint32, tag = "3")]
                    pub port_value: u32,
                }

                /// Per-filter endpoint metadata.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Metadata {
                    #[prost(map = "string, message", tag = "1")]
                    pub filter_metadata: ::std::collections::HashMap<
                        ::prost::alloc::string::String,
                        ::prost_types::Struct,
                    >,
                }
            }
        }

        pub mod endpoint {
            //! Endpoint configuration types.

            pub mod v3 {
                //! Endpoint v3 API.

                use super::super::core::v3 as core_v3;

                /// Load assignment for one upstream cluster.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct ClusterLoadAssignment {
                    #[prost(string, tag = "1")]
                    pub cluster_name: ::prost::alloc::string::String,
                    #[prost(message, repeated, tag = "2")]
                    pub endpoints: ::prost::alloc::vec::Vec<LocalityLbEndpoints>,
                }

                /// Endpoints sharing one locality, weighted as a group.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct LocalityLbEndpoints {
                    #[prost(message, optional, tag = "1")]
                    pub locality: ::core::option::Option<core_v3::Locality>,
                    #[prost(message, repeated, tag = "2")]
                    pub lb_endpoints: ::prost::alloc::vec::Vec<LbEndpoint>,
                    #[prost(message, optional, tag = "3")]
                    pub load_balancing_weight: ::core::option::Option<u32>,
                    #[prost(uint32, tag = "5")]
                    pub priority: u32,
                }

                /// One load-balanced endpoint.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct LbEndpoint {
                    #[prost(message, optional, tag = "1")]
                    pub endpoint: ::core::option::Option<Endpoint>,
                    #[prost(message, optional, tag = "3")]
                    pub metadata: ::core::option::Option<core_v3::Metadata>,
                    #[prost(message, optional, tag = "4")]
                    pub load_balancing_weight: ::core::option::Option<u32>,
                }

                /// The upstream host itself.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Endpoint {
                    #[prost(message, optional, tag = "1")]
                    pub address: ::core::option::Option<core_v3::Address>,
                }
            }
        }
    }
}

/// Type URL constants for the resources this crate can encode.
pub mod type_url {
    /// Endpoint (ClusterLoadAssignment) type URL.
    pub const ENDPOINT: &str =
        "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";
}

impl envoy::config::endpoint::v3::ClusterLoadAssignment {
    /// Pack this assignment into a type-erased [`Any`] resource.
    pub fn to_any(&self) -> prost_types::Any {
        prost_types::Any {
            type_url: type_url::ENDPOINT.to_string(),
            value: self.encode_to_vec(),
        }
    }
}

impl envoy::config::core::v3::SocketAddress {
    /// Build a socket address from host and port.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port_value: u32::from(port),
        }
    }
}

impl envoy::config::core::v3::Address {
    /// Build an address wrapping a socket address.
    pub fn socket(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: Some(envoy::config::core::v3::address::Address::SocketAddress(
                envoy::config::core::v3::SocketAddress::new(address, port),
            )),
        }
    }

    /// The socket address, if this address is one.
    pub fn as_socket(&self) -> Option<&envoy::config::core::v3::SocketAddress> {
        match self.address {
            Some(envoy::config::core::v3::address::Address::SocketAddress(ref sa)) => Some(sa),
            None => None,
        }
    }
}
