//! Integration tests for cross-frame pool reuse and eviction.

mod common;

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use rstest::rstest;

use common::{hdr_target, upload_storage, TestContext};
use redlilium_rdg::backend::dummy::DummyBackend;
use redlilium_rdg::types::{
    BindingKind, BindingLayout, BufferDescriptor, BufferUsage, ShaderStages,
    TextureViewDescriptor,
};
use redlilium_rdg::{PoolConfig, ResourcePool, SharedResourcePool};

fn material_layout() -> BindingLayout {
    BindingLayout::new()
        .with_slot(0, BindingKind::UniformBuffer, ShaderStages::VERTEX_FRAGMENT)
        .with_slot(1, BindingKind::SampledTexture, ShaderStages::FRAGMENT)
}

// ============================================================================
// Buffers
// ============================================================================

#[test]
fn test_same_frame_buffer_requests_are_distinct() {
    let mut ctx = TestContext::new();
    let a = ctx.pool.get_or_create_buffer(&ctx.backend, &upload_storage()).unwrap();
    let b = ctx.pool.get_or_create_buffer(&ctx.backend, &upload_storage()).unwrap();
    assert_ne!(a, b);
    assert_eq!(ctx.backend.stats().buffers_created, 2);
}

#[rstest]
#[case::next_frame(1, false)]
#[case::two_frames(2, true)]
#[case::three_frames(3, true)]
fn test_buffer_reuse_needs_two_frames(#[case] frames: u64, #[case] reused: bool) {
    let mut ctx = TestContext::new();
    let first = ctx.pool.get_or_create_buffer(&ctx.backend, &upload_storage()).unwrap();
    for _ in 0..frames {
        ctx.pool.advance_frame();
    }
    let again = ctx.pool.get_or_create_buffer(&ctx.backend, &upload_storage()).unwrap();
    assert_eq!(first == again, reused);
}

#[test]
fn test_buffer_reuse_matches_descriptor() {
    let mut ctx = TestContext::new();
    let uniform = BufferDescriptor::new(256, BufferUsage::UNIFORM);
    let storage = BufferDescriptor::new(256, BufferUsage::STORAGE);
    let a = ctx.pool.get_or_create_buffer(&ctx.backend, &uniform).unwrap();
    ctx.pool.advance_frame();
    ctx.pool.advance_frame();

    let b = ctx.pool.get_or_create_buffer(&ctx.backend, &storage).unwrap();
    let c = ctx.pool.get_or_create_buffer(&ctx.backend, &uniform).unwrap();
    assert_ne!(a, b);
    assert_eq!(a, c);
}

// ============================================================================
// Textures and views
// ============================================================================

#[test]
fn test_same_frame_texture_requests_are_distinct() {
    let mut ctx = TestContext::new();
    let a = ctx.pool.get_or_create_texture(&ctx.backend, &hdr_target()).unwrap();
    let b = ctx.pool.get_or_create_texture(&ctx.backend, &hdr_target()).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_texture_is_reused_next_frame() {
    let mut ctx = TestContext::new();
    let a = ctx.pool.get_or_create_texture(&ctx.backend, &hdr_target()).unwrap();
    ctx.pool.advance_frame();
    let b = ctx.pool.get_or_create_texture(&ctx.backend, &hdr_target()).unwrap();
    assert_eq!(a, b);
    assert_eq!(ctx.backend.stats().textures_created, 1);
}

#[test]
fn test_texture_view_is_shared_within_frame() {
    let mut ctx = TestContext::new();
    let texture = ctx.pool.get_or_create_texture(&ctx.backend, &hdr_target()).unwrap();
    let desc = TextureViewDescriptor::whole(texture);
    let a = ctx.pool.get_or_create_texture_view(&ctx.backend, &desc).unwrap();
    let b = ctx.pool.get_or_create_texture_view(&ctx.backend, &desc).unwrap();
    assert_eq!(a, b);
    assert!(ctx.pool.texture_view(a).is_some());
    assert_eq!(ctx.backend.stats().texture_views_created, 1);
}

// ============================================================================
// Binding sets
// ============================================================================

#[rstest]
#[case::same_frame(0, false)]
#[case::next_frame(1, false)]
#[case::two_frames(2, true)]
fn test_binding_set_reuse_follows_buffer_rule(#[case] frames: u64, #[case] reused: bool) {
    let mut ctx = TestContext::new();
    let first = ctx
        .pool
        .get_or_create_binding_set(&ctx.backend, &material_layout())
        .unwrap();
    for _ in 0..frames {
        ctx.pool.advance_frame();
    }
    let again = ctx
        .pool
        .get_or_create_binding_set(&ctx.backend, &material_layout())
        .unwrap();
    assert_eq!(first == again, reused);
}

// ============================================================================
// Eviction
// ============================================================================

#[rstest]
#[case::frame_zero(0)]
#[case::later_frame(5)]
fn test_eviction_after_threshold(#[case] start: u64) {
    let mut ctx = TestContext::new();
    for _ in 0..start {
        ctx.pool.advance_frame();
    }
    let texture = ctx.pool.get_or_create_texture(&ctx.backend, &hdr_target()).unwrap();
    let buffer = ctx.pool.get_or_create_buffer(&ctx.backend, &upload_storage()).unwrap();
    let set = ctx
        .pool
        .get_or_create_binding_set(&ctx.backend, &material_layout())
        .unwrap();

    // N + 2: still within the threshold.
    ctx.pool.advance_frame();
    ctx.pool.advance_frame();
    assert_eq!(ctx.pool.evict_stale(&ctx.backend), 0);
    assert!(ctx.pool.texture(texture).is_some());
    assert!(ctx.pool.buffer(buffer).is_some());
    assert!(ctx.pool.binding_set(set).is_some());

    // N + 3: gone.
    ctx.pool.advance_frame();
    assert_eq!(ctx.pool.evict_stale(&ctx.backend), 3);
    assert!(ctx.pool.texture(texture).is_none());
    assert!(ctx.pool.buffer(buffer).is_none());
    assert!(ctx.pool.binding_set(set).is_none());

    let stats = ctx.backend.stats();
    assert_eq!(stats.live_textures, 0);
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_binding_sets, 0);
}

#[test]
fn test_reuse_refreshes_eviction_clock() {
    let mut ctx = TestContext::new();
    let texture = ctx.pool.get_or_create_texture(&ctx.backend, &hdr_target()).unwrap();
    for _ in 0..10 {
        ctx.pool.advance_frame();
        assert_eq!(
            ctx.pool.get_or_create_texture(&ctx.backend, &hdr_target()).unwrap(),
            texture
        );
        assert_eq!(ctx.pool.evict_stale(&ctx.backend), 0);
    }
}

#[test]
fn test_custom_threshold() {
    let mut ctx = TestContext::with_config(PoolConfig {
        stale_frame_threshold: 0,
    });
    let buffer = ctx.pool.get_or_create_buffer(&ctx.backend, &upload_storage()).unwrap();
    assert_eq!(ctx.pool.evict_stale(&ctx.backend), 0);
    ctx.pool.advance_frame();
    assert_eq!(ctx.pool.evict_stale(&ctx.backend), 1);
    assert!(ctx.pool.buffer(buffer).is_none());
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn test_shared_pool_across_threads() {
    common::init_logger();
    let backend = Arc::new(DummyBackend::new());
    let pool: SharedResourcePool<DummyBackend> = Arc::new(Mutex::new(ResourcePool::default()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let backend = Arc::clone(&backend);
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                pool.lock()
                    .get_or_create_buffer(&backend, &upload_storage())
                    .unwrap()
            })
        })
        .collect();
    let mut keys: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    keys.sort();
    keys.dedup();

    assert_eq!(keys.len(), 4);
    assert_eq!(pool.lock().stats().buffers, 4);
    pool.lock().destroy_all(&backend);
    assert_eq!(backend.stats().live_buffers, 0);
}
