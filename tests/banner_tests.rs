use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use port_sweep::banner::{grab_banner, MAX_BANNER_CHARS};
use port_sweep::runner::annotate;
use port_sweep::ScanError;

/// Listener that greets every client with `greeting` and then idles.
async fn greeter(greeting: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = sock.write_all(greeting).await;
                tokio::time::sleep(Duration::from_secs(2)).await;
            });
        }
    });
    port
}

#[tokio::test]
async fn ssh_greeting_is_normalized() {
    let port = greeter(b"SSH-2.0-OpenSSH_8.9\r\n").await;
    let banner = grab_banner("127.0.0.1", port, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(banner, "SSH-2.0-OpenSSH_8.9 ");
}

#[tokio::test]
async fn chatty_service_is_truncated() {
    static LONG: [u8; 900] = [b'A'; 900];
    let port = greeter(&LONG).await;
    let banner = grab_banner("127.0.0.1", port, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(banner.chars().count() <= MAX_BANNER_CHARS + 3);
    assert!(banner.ends_with("..."));
    assert!(!banner.contains('\n'));
}

#[tokio::test]
async fn silent_service_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_sock, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let err = grab_banner("127.0.0.1", port, Duration::from_millis(150))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Timeout));
}

#[tokio::test]
async fn closed_port_is_an_error_not_a_panic() {
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    };
    let res = grab_banner("127.0.0.1", port, Duration::from_millis(200)).await;
    assert!(res.is_err());
}

#[tokio::test]
async fn annotate_degrades_to_empty_banner() {
    let talker = greeter(b"220 smtp ready\r\n").await;
    let closed = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    };
    let infos = annotate("127.0.0.1", &[talker, closed], Duration::from_millis(300)).await;
    assert_eq!(infos.len(), 2);
    let by_port = |p: u16| infos.iter().find(|i| i.port == p).unwrap();
    assert_eq!(by_port(talker).banner, "220 smtp ready ");
    assert!(by_port(closed).banner.is_empty());
    assert!(infos.windows(2).all(|w| w[0].port < w[1].port));
}
