use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::mappers::TaskInputs;
use crate::volume_element::VolumeElement;

/// 映射函数在任务中的角色
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapperRole {
    /// 运行外部工具前写出的输入文件（文件名）
    InputFile(String),
    /// 运行结束后解析出的输出（输出名）
    Output(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapperKey {
    pub task: String,
    pub method: String,
    pub role: MapperRole,
}

impl MapperKey {
    pub fn input(task: &str, method: &str, file: &str) -> Self {
        Self {
            task: task.to_string(),
            method: method.to_string(),
            role: MapperRole::InputFile(file.to_string()),
        }
    }

    pub fn output(task: &str, method: &str, name: &str) -> Self {
        Self {
            task: task.to_string(),
            method: method.to_string(),
            role: MapperRole::Output(name.to_string()),
        }
    }
}

impl std::fmt::Display for MapperKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.role {
            MapperRole::InputFile(file) => write!(f, "{}/{} 输入文件 {}", self.task, self.method, file),
            MapperRole::Output(name) => write!(f, "{}/{} 输出 {}", self.task, self.method, name),
        }
    }
}

/// 写出一个输入文件
pub type InputMapperFn = fn(&Path, &TaskInputs, &MapperConfig) -> MapperResult<()>;
/// 从结果文件解析输出
pub type OutputMapperFn = fn(&Path, &MapperConfig) -> MapperResult<VolumeElement>;

#[derive(Debug, Clone, Copy)]
pub enum Mapper {
    Input(InputMapperFn),
    Output(OutputMapperFn),
}

/// 映射函数注册表
/// 进程启动时填充一次，之后由工作流引擎按 (任务, 方法, 角色) 查询
pub struct MapperRegistry {
    mappers: RwLock<HashMap<MapperKey, Mapper>>,
    config: MapperConfig,
}

impl MapperRegistry {
    /// 创建注册表并注册所有内置映射函数
    pub fn new(config: MapperConfig) -> Self {
        let registry = Self::empty(config);
        crate::mappers::register_all(&registry);
        registry
    }

    pub fn empty(config: MapperConfig) -> Self {
        Self {
            mappers: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// 注册映射函数，返回被替换的旧函数
    pub fn register(&self, key: MapperKey, mapper: Mapper) -> Option<Mapper> {
        log::debug!("注册映射函数: {}", key);
        self.mappers.write().insert(key, mapper)
    }

    pub fn find(&self, key: &MapperKey) -> Option<Mapper> {
        self.mappers.read().get(key).copied()
    }

    /// 所有已注册的键，排序后返回
    pub fn registered_keys(&self) -> Vec<MapperKey> {
        let mut keys: Vec<MapperKey> = self.mappers.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 某个任务/方法需要写出的输入文件名
    pub fn input_files(&self, task: &str, method: &str) -> Vec<String> {
        self.registered_keys()
            .into_iter()
            .filter(|key| key.task == task && key.method == method)
            .filter_map(|key| match key.role {
                MapperRole::InputFile(file) => Some(file),
                MapperRole::Output(_) => None,
            })
            .collect()
    }

    /// 写出单个输入文件
    pub fn write_input(
        &self,
        task: &str,
        method: &str,
        file: &str,
        path: &Path,
        inputs: &TaskInputs,
    ) -> MapperResult<()> {
        let key = MapperKey::input(task, method, file);
        match self.find(&key) {
            Some(Mapper::Input(mapper)) => mapper(path, inputs, &self.config),
            _ => Err(MapperError::UnknownMapper(key.to_string())),
        }
    }

    /// 在 dir 下写出任务的全部输入文件，任一失败即中止
    pub fn write_inputs(
        &self,
        task: &str,
        method: &str,
        dir: &Path,
        inputs: &TaskInputs,
    ) -> MapperResult<Vec<PathBuf>> {
        let files = self.input_files(task, method);
        if files.is_empty() {
            return Err(MapperError::UnknownMapper(format!("{}/{} 没有输入文件", task, method)));
        }

        let mut written = Vec::with_capacity(files.len());
        for file in files {
            let path = dir.join(&file);
            self.write_input(task, method, &file, &path, inputs)?;
            written.push(path);
        }
        Ok(written)
    }

    /// 解析外部工具的结果
    pub fn read_output(
        &self,
        task: &str,
        method: &str,
        name: &str,
        path: &Path,
    ) -> MapperResult<VolumeElement> {
        let key = MapperKey::output(task, method, name);
        match self.find(&key) {
            Some(Mapper::Output(mapper)) => mapper(path, &self.config),
            _ => Err(MapperError::UnknownMapper(key.to_string())),
        }
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappers::*;

    #[test]
    fn test_default_bindings() {
        let registry = MapperRegistry::default();
        assert_eq!(
            registry.input_files(TASK_SEGMENT_GRAINS, METHOD_BURN),
            vec!["ensemble_data.txt", "orientation_data.txt", "pipeline.json"]
        );
        assert_eq!(
            registry.input_files(TASK_GENERATE_VOLUME_ELEMENT, METHOD_FROM_STATISTICS),
            vec!["pipeline.json"]
        );
        assert_eq!(registry.registered_keys().len(), 6);

        let key = MapperKey::output(TASK_SEGMENT_GRAINS, METHOD_BURN, OUTPUT_VOLUME_ELEMENT);
        assert!(matches!(registry.find(&key), Some(Mapper::Output(_))));
    }

    #[test]
    fn test_unknown_mapper() {
        let registry = MapperRegistry::default();
        let err = registry
            .read_output("simulate", "CP", OUTPUT_VOLUME_ELEMENT, Path::new("x.json"))
            .unwrap_err();
        assert!(matches!(err, MapperError::UnknownMapper(_)));
    }

    #[test]
    fn test_register_replaces_existing() {
        fn noop(_: &Path, _: &TaskInputs, _: &MapperConfig) -> MapperResult<()> {
            Ok(())
        }

        let registry = MapperRegistry::empty(MapperConfig::default());
        let key = MapperKey::input("t", "m", "a.txt");
        assert!(registry.register(key.clone(), Mapper::Input(noop)).is_none());
        assert!(registry.register(key, Mapper::Input(noop)).is_some());
    }

    #[test]
    fn test_file_names_follow_config() {
        let config = MapperConfig {
            pipeline_file: "segment.json".to_string(),
            ..MapperConfig::default()
        };
        let registry = MapperRegistry::new(config);
        assert!(
            registry
                .input_files(TASK_SEGMENT_GRAINS, METHOD_BURN)
                .contains(&"segment.json".to_string())
        );
    }
}
