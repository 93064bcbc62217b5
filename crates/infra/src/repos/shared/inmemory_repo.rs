use sandglass_domain::{Entity, ID};
use std::sync::Mutex;

pub fn insert<T: Clone + Entity<ID>>(item: &T, collection: &Mutex<Vec<T>>) {
    let mut collection = collection.lock().unwrap();
    collection.push(item.clone());
}

pub fn save<T: Clone + Entity<ID>>(item: &T, collection: &Mutex<Vec<T>>) {
    let mut collection = collection.lock().unwrap();
    for existing in collection.iter_mut() {
        if existing.id() == item.id() {
            *existing = item.clone();
            return;
        }
    }
    collection.push(item.clone());
}

pub fn find<T: Clone + Entity<ID>>(id: &ID, collection: &Mutex<Vec<T>>) -> Option<T> {
    let collection = collection.lock().unwrap();
    collection.iter().find(|item| item.id() == *id).cloned()
}

pub fn delete<T: Clone + Entity<ID>>(id: &ID, collection: &Mutex<Vec<T>>) -> Option<T> {
    let mut collection = collection.lock().unwrap();
    let pos = collection.iter().position(|item| item.id() == *id)?;
    Some(collection.remove(pos))
}

pub fn find_by<T: Clone, F: Fn(&T) -> bool>(collection: &Mutex<Vec<T>>, pred: F) -> Vec<T> {
    let collection = collection.lock().unwrap();
    collection.iter().filter(|item| pred(item)).cloned().collect()
}
