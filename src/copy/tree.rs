//! copy/tree — in-memory снимок иерархии бакетов.
//!
//! Корень — синтетический безымянный Container: его sub_containers — бакеты
//! верхнего уровня, собственных entries у корня нет. Каждый узел владеет своими
//! детьми эксклюзивно; обратных ссылок нет.

use std::collections::{BTreeMap, BTreeSet};

use super::path::ContainerPath;

/// Лист: ключ/значение внутри одного контейнера.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub name: Vec<u8>,
    /// Порядок = порядок перечисления в источнике.
    pub sub_containers: Vec<Container>,
    /// Записи, принадлежащие непосредственно этому контейнеру.
    pub entries: Vec<Entry>,
}

impl Container {
    /// Синтетический корень снимка.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn named(name: &[u8]) -> Self {
        Self {
            name: name.to_vec(),
            sub_containers: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Число контейнеров в поддереве (без самого узла).
    pub fn container_count(&self) -> u64 {
        let mut n = 0u64;
        let mut stack: Vec<&Container> = vec![self];
        while let Some(c) = stack.pop() {
            n += c.sub_containers.len() as u64;
            stack.extend(c.sub_containers.iter());
        }
        n
    }

    /// Число записей в поддереве, включая собственные.
    pub fn entry_count(&self) -> u64 {
        let mut n = 0u64;
        let mut stack: Vec<&Container> = vec![self];
        while let Some(c) = stack.pop() {
            n += c.entries.len() as u64;
            stack.extend(c.sub_containers.iter());
        }
        n
    }

    /// Максимальная глубина вложенности под этим узлом (0 — нет детей).
    pub fn depth(&self) -> usize {
        let mut max = 0usize;
        let mut stack: Vec<(&Container, usize)> = vec![(self, 0)];
        while let Some((c, d)) = stack.pop() {
            max = max.max(d);
            for sub in &c.sub_containers {
                stack.push((sub, d + 1));
            }
        }
        max
    }

    /// Плоский вид: путь контейнера -> множество (key, value).
    /// Порядок записей внутри контейнера не учитывается.
    pub fn flatten(&self) -> BTreeMap<ContainerPath, BTreeSet<(Vec<u8>, Vec<u8>)>> {
        let mut out = BTreeMap::new();
        let mut stack: Vec<(&Container, ContainerPath)> = vec![(self, ContainerPath::root())];
        while let Some((c, path)) = stack.pop() {
            for sub in &c.sub_containers {
                let sub_path = path.child(&sub.name);
                let set: BTreeSet<(Vec<u8>, Vec<u8>)> = sub
                    .entries
                    .iter()
                    .map(|e| (e.key.clone(), e.value.clone()))
                    .collect();
                out.insert(sub_path.clone(), set);
                stack.push((sub, sub_path));
            }
        }
        out
    }

    /// Структурная эквивалентность двух снимков: одинаковые пути контейнеров и
    /// одинаковые множества записей по каждому пути.
    pub fn equivalent(&self, other: &Container) -> bool {
        self.flatten() == other.flatten()
    }

    /// Первое расхождение между снимками (для диагностики verify).
    pub fn first_difference(&self, other: &Container) -> Option<String> {
        let a = self.flatten();
        let b = other.flatten();
        for (path, entries) in &a {
            match b.get(path) {
                None => return Some(format!("container {} missing in copy", path)),
                Some(other_entries) if other_entries != entries => {
                    return Some(format!(
                        "container {} entries differ: {} in source, {} in copy",
                        path,
                        entries.len(),
                        other_entries.len()
                    ))
                }
                Some(_) => {}
            }
        }
        b.keys()
            .find(|path| !a.contains_key(*path))
            .map(|path| format!("unexpected container {} in copy", path))
    }
}

// Разбор поддерева без рекурсии: глубокие цепочки не переполняют стек.
impl Drop for Container {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.sub_containers);
        while let Some(mut c) = pending.pop() {
            pending.append(&mut c.sub_containers);
        }
    }
}
