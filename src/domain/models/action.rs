use super::DocumentIdentity;

#[derive(Debug)]
pub struct QueryRequest {
    pub session_id: String,
    pub identity: DocumentIdentity,
    pub text: String,
}

#[derive(Debug)]
pub enum Action {
    Query(QueryRequest),
}
