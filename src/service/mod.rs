//! # Client Services
//!
//! Stubs presenting remote operations as ordinary async calls.
//!
//! ## Components
//! - **ClientStub**: generic `rpc(name, args, metadata)` over a fresh connection per call
//! - **RemoteUserDirectory** / **RemoteAuthenticationService**: typed wrappers
//!
//! ## Example
//! ```no_run
//! use auth_rpc::directory::Credentials;
//! use auth_rpc::service::{ClientStub, RemoteAuthenticationService, RemoteUserDirectory};
//!
//! # async fn run() -> auth_rpc::error::Result<()> {
//! let stub = ClientStub::new("127.0.0.1:9000");
//! let auth = RemoteAuthenticationService::new(stub.clone());
//! let users = RemoteUserDirectory::new(stub);
//!
//! let token = auth.authenticate(&Credentials::new("alice", "secret"), None).await?;
//! let me = users.get_user("alice", Some(&token)).await?;
//! println!("{me}");
//! # Ok(())
//! # }
//! ```

pub mod remote;
pub mod stub;

pub use remote::{RemoteAuthenticationService, RemoteUserDirectory};
pub use stub::ClientStub;
