pub(crate) mod user_identity;
