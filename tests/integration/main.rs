mod helpers;
mod test_account_flows;
mod test_content_flows;
mod test_engagement_flows;
mod test_postgres_store;
mod test_upload;
