use super::*;
use crate::foundation::core::Canvas;
use crate::foundation::error::ReelError;
use crate::model::item::{Geometry, Item};
use std::collections::HashMap;

#[derive(Default)]
struct CountingFetcher {
    hits: Mutex<HashMap<String, usize>>,
    broken: HashSet<String>,
}

impl CountingFetcher {
    fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

impl MediaFetcher for CountingFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = ReelResult<Vec<u8>>> + Send {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let res = if self.broken.contains(url) {
            Err(ReelError::transport(format!("404 {url}")))
        } else {
            Raster::new(Canvas::new(2, 2).unwrap()).encode_png()
        };
        async move { res }
    }
}

fn image(src: &str) -> Item {
    Item::image(src, Geometry::new(0.0, 0.0, 2.0, 2.0))
}

#[test]
fn remote_sources_skip_local_and_duplicates() {
    let layer = Layer::new(1.0).with_items(vec![
        image("https://cdn/a.png"),
        image("local.png"),
        image("https://cdn/a.png"),
        image("http://cdn/b.png"),
    ]);
    assert_eq!(
        remote_sources(&layer),
        ["https://cdn/a.png", "http://cdn/b.png"]
    );
}

#[test]
fn adjacent_layers_are_previous_then_next() {
    let tl = Timeline::from_layers(vec![
        Layer::with_id(LayerId::from("A"), 1.0),
        Layer::with_id(LayerId::from("B"), 1.0),
        Layer::with_id(LayerId::from("C"), 1.0),
    ]);
    let ids = |i| -> Vec<String> {
        adjacent_layers(&tl, i)
            .iter()
            .map(|l| l.id.to_string())
            .collect()
    };
    assert_eq!(ids(1), ["A", "C"]);
    assert_eq!(ids(0), ["B"]);
    assert_eq!(ids(2), ["B"]);
}

#[tokio::test(start_paused = true)]
async fn preloaded_layers_are_not_fetched_again() {
    let fetcher = Arc::new(CountingFetcher::default());
    let cache = Arc::new(MemoryAssetResolver::new());
    let preloader = Preloader::new(fetcher.clone(), cache.clone());
    let a = LayerId::from("A");
    let work = vec![(a.clone(), vec!["https://cdn/a.png".to_string()])];

    assert_eq!(preloader.schedule(work.clone()), 1);
    assert_eq!(preloader.schedule(work.clone()), 0);
    preloader.wait_idle().await;

    assert!(preloader.is_done(&a));
    assert!(cache.contains("https://cdn/a.png"));
    assert_eq!(preloader.schedule(work), 0);
    assert_eq!(fetcher.hits("https://cdn/a.png"), 1);
}

#[tokio::test(start_paused = true)]
async fn cached_sources_are_skipped() {
    let fetcher = Arc::new(CountingFetcher::default());
    let cache = Arc::new(MemoryAssetResolver::new());
    cache.insert("https://cdn/x.png", Raster::new(Canvas::new(1, 1).unwrap()));
    let preloader = Preloader::new(fetcher.clone(), cache);
    preloader.schedule(vec![(
        LayerId::from("B"),
        vec!["https://cdn/x.png".to_string()],
    )]);
    preloader.wait_idle().await;
    assert!(preloader.is_done(&LayerId::from("B")));
    assert_eq!(fetcher.hits("https://cdn/x.png"), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_layers_can_be_retried() {
    let fetcher = Arc::new(CountingFetcher {
        broken: HashSet::from(["https://cdn/bad.png".to_string()]),
        ..CountingFetcher::default()
    });
    let preloader = Preloader::new(fetcher.clone(), Arc::new(MemoryAssetResolver::new()));
    let c = LayerId::from("C");
    let work = vec![(
        c.clone(),
        vec![
            "https://cdn/bad.png".to_string(),
            "https://cdn/good.png".to_string(),
        ],
    )];
    preloader.schedule(work.clone());
    preloader.wait_idle().await;
    assert!(!preloader.is_done(&c));
    assert_eq!(fetcher.hits("https://cdn/good.png"), 1);

    assert_eq!(preloader.schedule(work), 1);
    preloader.wait_idle().await;
    assert_eq!(fetcher.hits("https://cdn/bad.png"), 2);
    assert_eq!(fetcher.hits("https://cdn/good.png"), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_allows_rescheduling() {
    let fetcher = Arc::new(CountingFetcher::default());
    let preloader = Preloader::new(fetcher, Arc::new(MemoryAssetResolver::new()));
    let d = LayerId::from("D");
    let work = vec![(d.clone(), vec!["https://cdn/d.png".to_string()])];
    assert_eq!(preloader.schedule(work.clone()), 1);
    preloader.cancel();
    assert!(!preloader.is_done(&d));
    assert_eq!(preloader.schedule(work), 1);
    preloader.wait_idle().await;
    assert!(preloader.is_done(&d));
}
