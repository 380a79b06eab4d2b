use crate::domain::user::entity::User;

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub user: User,
}
