mod custom_annotations;
mod repository_wiring;
mod snapshots;
