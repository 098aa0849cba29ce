pub mod binder;
pub mod environment;
pub mod lighting;
pub mod material;
pub mod serialization;
pub mod textures;

use glam::{Mat4, Vec3};

use crate::scene::environment::{Background, EnvironmentMap};
use crate::scene::lighting::PointLight;
use crate::scene::material::PhysicalMaterial;
use crate::scene::textures::TextureStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

impl MeshId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Triangle list geometry in node-local space.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for vertex in &vertices {
            let position = Vec3::from(vertex.position);
            min = min.min(position);
            max = max.max(position);
        }
        if vertices.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }
        Self {
            vertices,
            indices,
            bounds_min: min,
            bounds_max: max,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.bounds_min + self.bounds_max) * 0.5
    }
}

/// One entry of the scene hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub local: Mat4,
    pub world: Mat4,
    pub visible: bool,
    pub mesh: Option<MeshId>,
    pub material: Option<PhysicalMaterial>,
    /// One primitive of a multi-primitive parent. Pieces draw with the
    /// parent's material whenever the parent has one.
    pub piece: bool,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            visible: true,
            mesh: None,
            material: None,
            piece: false,
        }
    }
}

/// A mesh node that survived visibility culling, ready for drawing.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub node: NodeId,
    pub mesh: MeshId,
    pub world: Mat4,
    /// Node whose material this draw uses: `node` itself or a piece's parent.
    pub material: NodeId,
}

/// Scene graph plus the shared resources every node may reference.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    meshes: Vec<MeshData>,
    pub textures: TextureStore,
    pub lights: Vec<PointLight>,
    pub background: Background,
    environment: Option<EnvironmentMap>,
    environment_revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        match parent.and_then(|parent| self.nodes.get_mut(parent.0)) {
            Some(parent_node) => parent_node.children.push(id),
            None => {
                node.parent = None;
                self.roots.push(id);
            }
        }
        self.nodes.push(node);
        id
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id.0)
    }

    pub fn meshes(&self) -> &[MeshData] {
        &self.meshes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    #[cfg(test)]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    /// Pre-order, depth-first list of `root` and everything below it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    pub fn update_world_transforms(&mut self) {
        let mut stack: Vec<(NodeId, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|root| (*root, Mat4::IDENTITY))
            .collect();
        while let Some((id, parent_world)) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.world = parent_world * node.local;
            let world = node.world;
            stack.extend(node.children.iter().rev().map(|child| (*child, world)));
        }
    }

    /// Mesh nodes with a material whose whole ancestor chain is visible.
    pub fn visible_draws(&self) -> Vec<DrawItem> {
        let mut draws = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if !node.visible {
                continue;
            }
            if let (Some(mesh), Some(material)) = (node.mesh, self.material_owner(id)) {
                draws.push(DrawItem {
                    node: id,
                    mesh,
                    world: node.world,
                    material,
                });
            }
            stack.extend(node.children.iter().rev().copied());
        }
        draws
    }

    fn material_owner(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id.0)?;
        let parent = node.parent.filter(|_| node.piece);
        match parent {
            Some(parent) if self.material(parent).is_some() => Some(parent),
            _ => node.material.as_ref().map(|_| id),
        }
    }

    pub fn material(&self, id: NodeId) -> Option<&PhysicalMaterial> {
        self.nodes.get(id.0).and_then(|node| node.material.as_ref())
    }

    /// Installs the shared environment map. Materials bound to the scene
    /// environment pick it up on the next frame.
    pub fn set_environment(&mut self, environment: EnvironmentMap) {
        self.environment = Some(environment);
        self.environment_revision += 1;
    }

    pub fn environment(&self) -> Option<&EnvironmentMap> {
        self.environment.as_ref()
    }

    pub fn environment_revision(&self) -> u64 {
        self.environment_revision
    }
}

#[cfg(test)]
mod tests {
    use super::{MeshData, Node, Scene, Vertex};
    use crate::scene::material::PhysicalMaterial;
    use glam::{Mat4, Vec3};

    fn vertex(x: f32, y: f32, z: f32) -> Vertex {
        Vertex {
            position: [x, y, z],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0, 0.0],
        }
    }

    #[test]
    fn descendants_are_pre_order_depth_first() {
        let mut scene = Scene::new();
        let root = scene.add_node(Node::new("root"), None);
        let a = scene.add_node(Node::new("a"), Some(root));
        let a1 = scene.add_node(Node::new("a1"), Some(a));
        let b = scene.add_node(Node::new("b"), Some(root));

        let names: Vec<String> = scene
            .descendants(root)
            .into_iter()
            .filter_map(|id| scene.node(id).map(|node| node.name.clone()))
            .collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
        assert_eq!(scene.descendants(a), vec![a, a1]);
        assert_eq!(scene.node(b).and_then(|node| node.parent), Some(root));
    }

    #[test]
    fn world_transforms_compose_parent_first() {
        let mut scene = Scene::new();
        let mut parent = Node::new("parent");
        parent.local = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let parent = scene.add_node(parent, None);
        let mut child = Node::new("child");
        child.local = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let child = scene.add_node(child, Some(parent));

        scene.update_world_transforms();
        let world = scene.node(child).map(|node| node.world).unwrap_or_default();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn hidden_parent_hides_its_subtree() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(MeshData::new(
            vec![vertex(0.0, 0.0, 0.0), vertex(1.0, 0.0, 0.0), vertex(0.0, 1.0, 0.0)],
            vec![0, 1, 2],
        ));
        let root = scene.add_node(Node::new("root"), None);
        let mut shown = Node::new("shown");
        shown.mesh = Some(mesh);
        shown.material = Some(PhysicalMaterial::default());
        let shown = scene.add_node(shown, Some(root));
        let mut hidden = shown_copy(&scene, shown);
        hidden.visible = false;
        let hidden = scene.add_node(hidden, Some(root));
        let under_hidden = shown_copy(&scene, shown);
        scene.add_node(under_hidden, Some(hidden));

        let draws = scene.visible_draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].node, shown);
    }

    fn shown_copy(scene: &Scene, id: super::NodeId) -> Node {
        let mut node = scene.node(id).cloned().unwrap_or_else(|| Node::new("x"));
        node.children.clear();
        node
    }

    #[test]
    fn mesh_bounds_cover_all_vertices() {
        let mesh = MeshData::new(
            vec![vertex(-1.0, 0.0, 2.0), vertex(3.0, -2.0, 0.0)],
            vec![],
        );
        assert_eq!(mesh.bounds_min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(mesh.bounds_max, Vec3::new(3.0, 0.0, 2.0));
        assert_eq!(mesh.center(), Vec3::new(1.0, -1.0, 1.0));
    }
}
