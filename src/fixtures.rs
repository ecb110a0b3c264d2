//! Record types shared by the unit tests.

use std::sync::Arc;

use crate::descriptor::{Mappable, ShapeBuilder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Unknown = 0,
    Active = 1,
    Suspended = 2,
}

crate::map_enum!(Status {
    Unknown = 0,
    Active = 1,
    Suspended = 2,
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccountState {
    #[default]
    Pending = 0,
    Active = 1,
    Suspended = 2,
}

crate::map_enum!(AccountState {
    Pending = 0,
    Active = 1,
    Suspended = 2,
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressDto {
    pub street: String,
    pub city: String,
}

impl AddressDto {
    pub fn new(street: &str, city: &str) -> Self {
        Self {
            street: street.to_string(),
            city: city.to_string(),
        }
    }
}

impl Mappable for AddressDto {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("street", |a| &a.street, |a| &mut a.street);
        shape.field("city", |a| &a.city, |a| &mut a.city);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressEntity {
    pub street: String,
    pub city: String,
}

impl Mappable for AddressEntity {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("street", |a| &a.street, |a| &mut a.street);
        shape.field("city", |a| &a.city, |a| &mut a.city);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDto {
    pub name: String,
    pub age: i32,
    pub email: Option<String>,
    pub status: String,
    pub level: i32,
    pub tags: Vec<i32>,
    pub scores: Vec<i32>,
    pub address: Option<Arc<AddressDto>>,
    pub password: String,
    pub nickname: Option<String>,
}

impl UserDto {
    pub fn ann() -> Self {
        Self {
            name: "Ann".to_string(),
            age: 34,
            email: Some("ann@example.com".to_string()),
            status: "active".to_string(),
            level: 2,
            tags: vec![1, 2, 3],
            scores: vec![10, 20],
            address: Some(Arc::new(AddressDto::new("Main St", "Springfield"))),
            password: "secret".to_string(),
            nickname: Some("annie".to_string()),
        }
    }
}

impl Mappable for UserDto {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("name", |u| &u.name, |u| &mut u.name);
        shape.field("age", |u| &u.age, |u| &mut u.age);
        shape.field("email", |u| &u.email, |u| &mut u.email);
        shape.field("status", |u| &u.status, |u| &mut u.status);
        shape.field("level", |u| &u.level, |u| &mut u.level);
        shape.field("tags", |u| &u.tags, |u| &mut u.tags);
        shape.field("scores", |u| &u.scores, |u| &mut u.scores);
        shape.field("address", |u| &u.address, |u| &mut u.address);
        shape
            .field("password", |u| &u.password, |u| &mut u.password)
            .ignore_map();
        shape
            .field("nickname", |u| &u.nickname, |u| &mut u.nickname)
            .map_to("alias");
        shape.read_only("display", |u| format!("{} ({})", u.name, u.age));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserEntity {
    pub full_name: String,
    pub age: i64,
    pub email: Option<String>,
    pub status: Status,
    pub level: AccountState,
    pub tags: Vec<String>,
    pub scores: Box<[i64]>,
    pub address: Option<Arc<AddressEntity>>,
    pub password: String,
    pub alias: Option<String>,
    pub display_len: usize,
}

impl Mappable for UserEntity {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("full_name", |u| &u.full_name, |u| &mut u.full_name);
        shape.field("age", |u| &u.age, |u| &mut u.age);
        shape.field("email", |u| &u.email, |u| &mut u.email);
        shape.field("status", |u| &u.status, |u| &mut u.status);
        shape.field("level", |u| &u.level, |u| &mut u.level);
        shape.field("tags", |u| &u.tags, |u| &mut u.tags);
        shape.field("scores", |u| &u.scores, |u| &mut u.scores);
        shape.field("address", |u| &u.address, |u| &mut u.address);
        shape.field("password", |u| &u.password, |u| &mut u.password);
        shape.field("alias", |u| &u.alias, |u| &mut u.alias);
        shape.write_only("display", |u, display: String| u.display_len = display.len());
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Mappable for Point {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("x", |p| &p.x, |p| &mut p.x);
        shape.field("y", |p| &p.y, |p| &mut p.y);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Mappable for Point2D {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("x", |p| &p.x, |p| &mut p.x);
        shape.field("y", |p| &p.y, |p| &mut p.y);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Badge {
    pub code: String,
    pub secret: String,
    pub label: String,
}

impl Mappable for Badge {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("code", |b| &b.code, |b| &mut b.code);
        shape.field("secret", |b| &b.secret, |b| &mut b.secret);
        shape.field("label", |b| &b.label, |b| &mut b.label);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BadgeRecord {
    pub code: String,
    pub secret: String,
}

impl Mappable for BadgeRecord {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("code", |b| &b.code, |b| &mut b.code);
        shape
            .field("secret", |b| &b.secret, |b| &mut b.secret)
            .ignore_map();
        shape.read_only("label", |b| format!("badge {}", b.code));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measure {
    pub size: i32,
}

impl Mappable for Measure {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("Größe", |m| &m.size, |m| &mut m.size);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureRecord {
    pub size: i64,
}

impl Mappable for MeasureRecord {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.field("GRÖßE", |m| &m.size, |m| &mut m.size);
    }
}
