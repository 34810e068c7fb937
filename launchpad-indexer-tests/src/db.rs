use std::env;

use dotenvy::dotenv;
use tokio_postgres::NoTls;

/// Creates the test database when it does not exist yet.
pub async fn setup() {
    let db_url = database_url();

    if tokio_postgres::connect(&db_url, NoTls).await.is_err() {
        let (db_name, db_raw_url) = get_db_name_and_raw_url(&db_url);
        let (client, conn) = tokio_postgres::connect(&db_raw_url, NoTls)
            .await
            .unwrap_or_else(|_| panic!("Error connecting to {db_raw_url}"));
        tokio::spawn(conn);

        client.batch_execute(&format!(r#"CREATE DATABASE "{db_name}""#)).await.unwrap();
    }
}

pub fn database_url() -> String {
    dotenv().ok();

    env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL env variable needs to be set.")
}

fn get_db_name_and_raw_url(url: &str) -> (String, String) {
    let mut url_split = url.split('/').collect::<Vec<&str>>();

    let db_name = url_split.pop().expect("DATABASE NAME needs to be specified. See: sample.env");
    let db_raw_url = url_split.join("/");

    (db_name.to_string(), db_raw_url)
}
