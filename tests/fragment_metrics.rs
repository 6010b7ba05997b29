use std::collections::HashMap;
use std::sync::Arc;

use edgeblock::{
    application::context::DefaultContextManager,
    cache::{CacheKeySet, FragmentCache, RenderRequest, SsiFragmentCache, TokenSigner},
    domain::blocks::{Block, BlockId, BlockKind},
    infra::{catalog::BlockCatalog, routes::RouteTable, telemetry},
    presentation::blocks::HtmlBlockRenderer,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

const SECRET: &str = "My Token";

#[tokio::test]
async fn fragment_paths_emit_expected_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let block = Block::new(
        BlockId::new("/cms/footer").expect("block id"),
        BlockKind::Text,
        "Footer",
    )
    .with_updated_at("1");
    let signer = TokenSigner::new(SECRET).expect("signer");
    let cache = SsiFragmentCache::new(
        signer.clone(),
        Arc::new(RouteTable::for_ssi("/_fragments/ssi").expect("routes")),
        Arc::new(HtmlBlockRenderer::new()),
        Arc::new(BlockCatalog::from_blocks([block]).expect("catalog")),
        Arc::new(DefaultContextManager::new()),
    );

    let keys = CacheKeySet::for_block("/cms/footer", "1");
    cache.get(&keys).expect("include");
    cache.get(&keys).expect("include");

    let token = signer.sign(&keys).expect("token");
    cache
        .cache_action(&RenderRequest::new(token.as_str(), "/cms/footer", "1"))
        .await
        .expect("render");

    cache
        .cache_action(&RenderRequest::new("XXXXX", "/cms/footer", "1"))
        .await
        .expect_err("denied");

    let missing = signer
        .sign(&CacheKeySet::for_block("/not/found", "1"))
        .expect("token");
    cache
        .cache_action(&RenderRequest::new(missing, "/not/found", "1"))
        .await
        .expect_err("not found");

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((composite_key.key().name().to_string(), count)),
            _ => None,
        })
        .collect();

    let expected = [
        ("edgeblock_include_generated_total", 2),
        ("edgeblock_render_total", 1),
        ("edgeblock_render_denied_total", 1),
        ("edgeblock_render_not_found_total", 1),
    ];

    for (metric, count) in expected {
        assert_eq!(
            counters.get(metric).copied(),
            Some(count),
            "unexpected value for {metric}"
        );
    }
}
