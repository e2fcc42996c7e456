/// Authentication and authorization
///
/// # Modules
///
/// - [`jwt`]: HS256 session token verification
/// - [`middleware`]: optional bearer-token middleware and [`AuthContext`](middleware::AuthContext)
/// - [`authorization`]: the role-based policy for teams and projects
///
/// # Example
///
/// ```
/// use vexa_shared::auth::jwt::{create_token, validate_token, Claims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-of-at-least-thirty-two-bytes";
/// let token = create_token(&Claims::new("user_2abc"), secret)?;
/// assert_eq!(validate_token(&token, secret)?.sub, "user_2abc");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
