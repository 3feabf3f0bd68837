/// Convenience macros to dispatch enum methods
/// Example
/// ```rust
/// use mintfee_common::enum_dispatch;
///
/// pub enum Source {
///     Mongo(MongoSource),
///     Redis(RedisSource),
/// }
///
/// impl Source {
///    pub async fn find(&self) -> Option<String> {
///       match self {
///          Self::Mongo(x) => x.find().await,
///          Self::Redis(x) => x.find().await,
///       }
///       // Equivalent to
///       enum_dispatch!(self {
///          Self::Mongo(x) |
///          Self::Redis(x) => x.find().await
///       })
///    }
/// }
///
/// ```
#[macro_export]
macro_rules! enum_dispatch {
    ($self: ident { $($($variant: pat_param)|* => $do: expr),+ }) => {
        match $self {
            $(
                $($variant => $do),+
            ),+
        }
    };
}
