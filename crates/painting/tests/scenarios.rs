//! Cross-crate painting and resampling scenarios

use std::sync::{Arc, Mutex};

use glam::{Mat2, Vec2, Vec3};
use painting::{Brush, BrushProperty, PaintTarget, Painter, ResampleAccumulator, SurfelGrid};
use stipple_config::{EngineConfig, ResampleConfig};
use surfels::{AttributeSet, Color, LocalFrame, Notify, StoreEvent, SurfelStore};

fn grid_store(size: u32, schema: AttributeSet) -> (SurfelStore, SurfelGrid) {
    let mut store = SurfelStore::with_schema(schema);
    let mut grid = SurfelGrid::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let id = store.add_surfel(Notify::Suppress);
            store
                .get_mut(id)
                .unwrap()
                .set_position(Vec3::new(x as f32, y as f32, 0.0))
                .set_normal(Vec3::Z)
                .set_radius(0.75)
                .set_diffuse_color(Color::rgb(20, 200, 90));
            grid.set(x, y, Some(id));
        }
    }
    store.notify_collection_changed();
    (store, grid)
}

#[test]
fn test_solid_gray_paint_on_four_by_four_grid() {
    let schema = AttributeSet::POSITION
        | AttributeSet::NORMAL
        | AttributeSet::RADIUS
        | AttributeSet::DIFFUSE_COLOR;
    let (mut store, grid) = grid_store(4, schema);
    let before: Vec<(Vec3, Vec3)> = store.iter().map(|s| (s.position(), s.normal())).collect();

    let gray = 128.0 / 255.0;
    let mut brush = Brush::new(4, 4).unwrap();
    brush
        .set_solid(BrushProperty::DiffuseColor, &[gray, gray, gray], 1.0)
        .unwrap();

    let summary = Painter::default()
        .paint(&mut store, PaintTarget::Grid(&grid), &brush)
        .unwrap();

    assert_eq!(summary.painted, 16);
    assert_eq!(store.schema(), schema);
    for (surfel, (position, normal)) in store.iter().zip(before) {
        assert_eq!(surfel.diffuse_color(), Color::rgb(128, 128, 128));
        assert_eq!(surfel.position(), position);
        assert_eq!(surfel.normal(), normal);
    }
}

#[test]
fn test_paint_emits_one_collection_event() {
    let (mut store, grid) = grid_store(3, AttributeSet::POSITION | AttributeSet::RADIUS);
    let before = store.schema();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store.subscribe(move |event| sink.lock().unwrap().push(*event));

    let mut brush = Brush::new(3, 3).unwrap();
    brush.set_solid(BrushProperty::Shininess, &[0.2], 1.0).unwrap();
    brush
        .set_solid(BrushProperty::SpecularColor, &[1.0, 0.5, 0.0], 1.0)
        .unwrap();
    brush
        .set_solid(BrushProperty::AmbientCoefficient, &[0.3], 0.5)
        .unwrap();
    Painter::default()
        .paint(&mut store, PaintTarget::Grid(&grid), &brush)
        .unwrap();

    // Three unstored attributes are upgraded in a single schema change
    let events = events.lock().unwrap();
    let upgrades: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, StoreEvent::SchemaChanged { .. }))
        .collect();
    assert_eq!(
        upgrades,
        vec![&StoreEvent::SchemaChanged {
            old: before,
            new: before
                | AttributeSet::SHININESS
                | AttributeSet::SPECULAR_COLOR
                | AttributeSet::AMBIENT_COEFFICIENT,
        }]
    );
    assert_eq!(events.last(), Some(&StoreEvent::CollectionChanged { len: 9 }));
}

#[test]
fn test_rejected_paint_leaves_schema_untouched() {
    let (mut store, grid) = grid_store(3, AttributeSet::POSITION);
    let before = store.schema();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store.subscribe(move |event| sink.lock().unwrap().push(*event));

    let mut brush = Brush::new(4, 4).unwrap();
    brush.set_solid(BrushProperty::Shininess, &[0.2], 1.0).unwrap();
    assert!(
        Painter::default()
            .paint(&mut store, PaintTarget::Grid(&grid), &brush)
            .is_err()
    );

    assert_eq!(store.schema(), before);
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_select_painting_across_grid() {
    let (mut store, grid) = grid_store(2, AttributeSet::POSITION);
    let mut brush = Brush::new(2, 2).unwrap();
    brush
        .set_solid(BrushProperty::Selection, &[1.0, 0.0, 0.5], 1.0)
        .unwrap();

    let summary = Painter::default()
        .select(&mut store, PaintTarget::Grid(&grid), &brush)
        .unwrap();

    assert_eq!(summary.painted, 4);
    assert_eq!(store.selected(surfels::SelectionChannel::One).len(), 4);
    assert!(store.selected(surfels::SelectionChannel::Two).is_empty());
    assert!(store.selected(surfels::SelectionChannel::Three).is_empty());
}

/// Uniform `size` x `size` surfel patch over the unit texture square
fn uniform_patch(size: u32) -> SurfelStore {
    let schema = AttributeSet::POSITION
        | AttributeSet::NORMAL
        | AttributeSet::RADIUS
        | AttributeSet::DIFFUSE_COLOR
        | AttributeSet::TEXTURE_COORDINATE;
    let mut store = SurfelStore::with_schema(schema);
    store.reserve((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            let uv = Vec2::new((x as f32 + 0.5) / size as f32, (y as f32 + 0.5) / size as f32);
            let id = store.add_surfel(Notify::Suppress);
            store
                .get_mut(id)
                .unwrap()
                .set_position(uv.extend(0.0))
                .set_normal(Vec3::Z)
                .set_radius(1.0 / size as f32)
                .set_diffuse_color(Color::rgb(200, 100, 50))
                .set_texture_coordinate(uv);
        }
    }
    store
}

/// Texture coordinates equal world xy, so the Jacobian is the frame's xy part
fn uv_jacobian() -> Mat2 {
    let frame = LocalFrame::from_normal(Vec3::Z);
    Mat2::from_cols(frame.x.truncate(), frame.y.truncate())
}

fn resample(source: &mut SurfelStore, size: u32, config: ResampleConfig) -> SurfelStore {
    let mut accumulator = ResampleAccumulator::new(size, size, config);
    for id in source.ids() {
        accumulator.rasterize_surfel(source, id, uv_jacobian()).unwrap();
    }
    let mut target = SurfelStore::new();
    let summary = accumulator.finalize_into(source, &mut target);
    assert_eq!(summary.created, (size * size) as usize);
    assert_eq!(summary.discarded_cells, 0);
    target
}

#[test]
fn test_resampling_at_same_resolution_is_idempotent() {
    const SIZE: u32 = 24;
    let config = EngineConfig::default().resample;

    let mut source = uniform_patch(SIZE);
    let mut first = resample(&mut source, SIZE, config);
    assert!(source.is_empty());
    let second = resample(&mut first, SIZE, config);

    assert_eq!(second.len(), (SIZE * SIZE) as usize);
    for index in 0..second.len() {
        let surfel = second.at(index).unwrap();
        assert_eq!(surfel.diffuse_color(), Color::rgb(200, 100, 50));
        assert!((surfel.normal() - Vec3::Z).length() < 1e-3);
        assert!((surfel.radius() - 1.0 / SIZE as f32).abs() < 1e-3);

        // Away from the patch border the filter reproduces positions exactly
        let (x, y) = (index as u32 % SIZE, index as u32 / SIZE);
        if (9..=14).contains(&x) && (9..=14).contains(&y) {
            let uv = surfel.texture_coordinate();
            assert!((surfel.position() - uv.extend(0.0)).length() < 1e-3);
        }
    }
}
