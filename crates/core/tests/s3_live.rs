//! Round trip against a real bucket. Runs only when
//! `OBJECTSTORE_TEST_S3_PATH` names a writable base path such as
//! `s3://my-bucket/objectstore-ci`; credentials come from the environment.

use objectstore::{BackendKind, ErrorKind, Store};

#[tokio::test]
async fn live_round_trip() {
    let Ok(base) = std::env::var("OBJECTSTORE_TEST_S3_PATH") else {
        return;
    };
    let store = Store::open(&base).unwrap();
    assert_eq!(store.kind(), BackendKind::S3);

    let name = format!("live-{}/jan.csv", std::process::id());
    store.write(&name, b"x,y\n1,2").await.unwrap();
    assert_eq!(store.read(&name).await.unwrap(), b"x,y\n1,2");

    let names = store.list().await.unwrap();
    assert!(names.contains(&name), "{names:?}");

    store.delete(&name).await.unwrap();
    let err = store.read(&name).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
