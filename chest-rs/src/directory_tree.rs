use bitflags::bitflags;

/// Reserved "no parent" value in a directory node's parent field. Not a
/// valid node index; the parent-pointer graph is a forest rooted at nodes
/// carrying this value.
pub const NO_PARENT: u32 = 0xFFFF_FFFF;

bitflags! {
    /// Attribute bits carried on a directory node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u32 {
        /// The node is a file; nodes without this bit are directories.
        const FILE = 0x4000;
        /// The file's content is stored encrypted.
        const ENCRYPTED = 0x0100;
    }
}

/// A node of the cache's directory forest.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    pub name: String,
    /// Index of the parent node, or [`NO_PARENT`] for a root.
    pub parent: u32,
    /// Declared size in bytes; meaningful for file nodes.
    pub size: u32,
    pub flags: NodeFlags,
    /// Head index into the block-entry chain; meaningful for file nodes.
    /// The total block-entry count means "no blocks".
    pub first_block: u32,
}

/// One block entry: a run of file bytes backed by a sector chain.
#[derive(Debug, Clone, Copy)]
pub struct BlockEntry {
    /// Offset of this run within the logical file.
    pub file_offset: u32,
    /// Number of file bytes this run holds.
    pub size: u32,
    /// First sector index of the run's sector chain.
    pub first_sector: u32,
    /// Index of the next block entry; the total entry count terminates.
    pub next: u32,
}

/// A file resolved from the directory forest: full path, declared size,
/// attribute bits and the ordered block entries holding its bytes.
///
/// The catalog is built once per wrapper and never mutated afterward.
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Index of the file's node in the directory table.
    pub node_index: u32,
    /// Root-to-leaf path, `/`-joined.
    pub path: String,
    pub size: u32,
    pub encrypted: bool,
    pub blocks: Vec<BlockEntry>,
}

/// Resolves every file node of the forest into a [`FileInfo`] catalog, in
/// node-table order.
pub fn build_catalog(nodes: &[DirectoryNode], block_entries: &[BlockEntry]) -> Vec<FileInfo> {
    let mut files = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        if !node.flags.contains(NodeFlags::FILE) {
            continue;
        }
        files.push(FileInfo {
            node_index: index as u32,
            path: resolve_path(nodes, index as u32),
            size: node.size,
            encrypted: node.flags.contains(NodeFlags::ENCRYPTED),
            blocks: collect_blocks(block_entries, node.first_block),
        });
    }
    files
}

/// Walks the parent chain from a node to its root, collecting names, and
/// joins them in root-to-leaf order. A missing parent or a cyclic parent
/// pointer truncates the walk rather than failing it.
fn resolve_path(nodes: &[DirectoryNode], node_index: u32) -> String {
    let mut names = Vec::new();
    let mut current = node_index;
    let mut steps = 0usize;
    while (current as usize) < nodes.len() && steps <= nodes.len() {
        let node = &nodes[current as usize];
        names.push(node.name.as_str());
        if node.parent == NO_PARENT {
            break;
        }
        current = node.parent;
        steps += 1;
    }
    names.reverse();
    names.join("/")
}

/// Follows the block-entry chain from `head` until the reserved terminal
/// value (the total entry count). An out-of-range or cyclic link truncates
/// the chain rather than failing it.
fn collect_blocks(block_entries: &[BlockEntry], head: u32) -> Vec<BlockEntry> {
    let terminal = block_entries.len() as u32;
    let mut blocks = Vec::new();
    let mut current = head;
    while current != terminal {
        if current as usize >= block_entries.len() || blocks.len() >= block_entries.len() {
            break;
        }
        let entry = block_entries[current as usize];
        blocks.push(entry);
        current = entry.next;
    }
    blocks
}
