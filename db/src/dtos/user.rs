pub struct UserCreateRequest {
    /// Already normalized.
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}
