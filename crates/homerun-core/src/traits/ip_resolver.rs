// # IP Resolver Trait
//
// Defines the interface for discovering the host's public IP address.
//
// ## Implementations
//
// - HTTP endpoint (ipify, icanhazip, ...): `homerun-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use homerun_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let ip = resolver.resolve().await?;
//     println!("public IP: {ip}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for public IP resolvers
///
/// A resolver is bound to a single endpoint at construction and is
/// otherwise stateless: every call performs a fresh lookup.
///
/// # Contract
///
/// - The returned string is the address exactly as the endpoint reported it
///   (minus surrounding newlines). It is not validated or parsed.
/// - Every failure (non-200 status, network error, timeout, empty answer)
///   is reported as [`Error::IpUnavailable`](crate::Error::IpUnavailable).
/// - No retries. The scheduler retries on its next tick.
/// - Every call must be bounded in time.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The address reported by the endpoint
    /// - `Err(Error::IpUnavailable)`: If no address could be obtained
    async fn resolve(&self) -> Result<String, crate::Error>;

    /// Where this resolver asks (for logging)
    fn endpoint(&self) -> &str;
}
