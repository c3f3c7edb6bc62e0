use bevy::prelude::*;

/// Marker for the sprite that shows the composited map
#[derive(Component)]
pub struct MapCanvasSprite;

/// Marker component for the UI text that displays the current zoom level
#[derive(Component)]
pub struct ZoomLevelText;
